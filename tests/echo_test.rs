use rustf_blade::{BladeCompiler, CompilerConfig, MemoryFileStore, TagPair};
use std::sync::Arc;

fn blade() -> BladeCompiler {
    BladeCompiler::new(Arc::new(MemoryFileStore::new())).expect("Failed to create compiler")
}

fn compile(template: &str) -> String {
    blade()
        .compile_string(template)
        .expect("Failed to compile template")
}

#[test]
fn test_escaped_and_raw_echoes() {
    assert_eq!(
        compile("<h1>{{{ $title }}}</h1><div>{{ $html }}</div>"),
        "<h1><?php echo e($title); ?></h1><div><?php echo $html; ?></div>"
    );
}

#[test]
fn test_echo_inside_attribute() {
    assert_eq!(
        compile("<a href=\"{{ $url }}\">{{{ $label }}}</a>"),
        "<a href=\"<?php echo $url; ?>\"><?php echo e($label); ?></a>"
    );
}

#[test]
fn test_echo_followed_by_newline_keeps_line_break() {
    assert_eq!(
        compile("{{ $a }}\n{{ $b }}\r\nend"),
        "<?php echo $a; ?>\n\n<?php echo $b; ?>\r\n\r\nend"
    );
}

#[test]
fn test_echo_default_value() {
    assert_eq!(
        compile("{{{ $name or 'Guest' }}}"),
        "<?php echo e(isset($name) ? $name : 'Guest'); ?>"
    );
    assert_eq!(
        compile("{{ $user->name or $fallback }}"),
        "<?php echo isset($user->name) ? $user->name : $fallback; ?>"
    );
}

#[test]
fn test_at_escape_prints_tags() {
    assert_eq!(
        compile("@{{ $js }} and @{{{ $raw }}} but {{ $real }}"),
        "{{ $js }} and {{{ $raw }}} but <?php echo $real; ?>"
    );
}

#[test]
fn test_comments_are_not_echoed() {
    assert_eq!(
        compile("{{-- shown to nobody --}}\nText"),
        "<?php /* shown to nobody */ ?>\nText"
    );
    assert_eq!(
        compile("{{-- closes */ early --}}"),
        "<?php /* closes * / early */ ?>"
    );
}

#[test]
fn test_custom_tags_from_config() {
    let config = CompilerConfig {
        content_tags: TagPair::new("<%", "%>"),
        escaped_tags: TagPair::new("<%%", "%%>"),
        echo_format: "htmlspecialchars(%s)".to_string(),
        ..CompilerConfig::default()
    };
    let blade = BladeCompiler::with_config(Arc::new(MemoryFileStore::new()), config)
        .expect("Failed to create compiler");

    assert_eq!(
        blade.compile_string("<% $a %> <%% $b %%> {{ $c }}").unwrap(),
        "<?php echo $a; ?> <?php echo htmlspecialchars($b); ?> {{ $c }}"
    );
    assert_eq!(blade.escaped_tags(), &TagPair::new("<%%", "%%>"));
}

#[test]
fn test_identical_tag_pairs_rejected_at_construction() {
    let config = CompilerConfig {
        escaped_tags: TagPair::new("{{", "}}"),
        ..CompilerConfig::default()
    };
    let err = BladeCompiler::with_config(Arc::new(MemoryFileStore::new()), config).unwrap_err();
    assert_eq!(err.error_code(), "E_INVALID_TAGS");
}

#[test]
fn test_echo_round_trip_in_markup() {
    let templates = [
        ("{{ $a }}", "<?php echo $a; ?>"),
        ("{{{ $a }}}", "<?php echo e($a); ?>"),
        ("x{{ $a }}y{{{ $b }}}z", "x<?php echo $a; ?>y<?php echo e($b); ?>z"),
    ];

    let blade = blade();
    for (template, expected) in templates {
        assert_eq!(
            blade.compile_string(template).unwrap(),
            expected,
            "compiling {}",
            template
        );
    }
}
