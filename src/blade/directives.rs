//! Directive handlers
//!
//! Every `@name(...)` directive is looked up by name in an explicit
//! [`Directives`] table built when the compiler is created. A handler receives
//! the raw argument text, parentheses included, and returns the PHP code that
//! replaces the directive.

use super::state::CompileState;
use crate::error::Result;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Compiles one directive occurrence into host code
pub type DirectiveHandler =
    Arc<dyn Fn(Option<&str>, &mut CompileState) -> Result<String> + Send + Sync>;

/// Parent render call shared by `@extends` and `@include`
const RENDER_CALL: &str =
    "<?php echo $__env->make(%s, array_except(get_defined_vars(), array('__data', '__path')))->render(); ?>";

/// Name to handler table
#[derive(Clone, Default)]
pub struct Directives {
    handlers: IndexMap<String, DirectiveHandler>,
}

impl fmt::Debug for Directives {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.handlers.keys()).finish()
    }
}

impl Directives {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with every built-in directive
    pub fn builtin() -> Self {
        let mut directives = Self::new();

        // Conditionals
        directives.register("if", compile_if);
        directives.register("elseif", compile_elseif);
        directives.register("else", compile_else);
        directives.register("endif", compile_endif);
        directives.register("unless", compile_unless);
        directives.register("endunless", compile_endif);
        directives.register("isset", compile_isset);
        directives.register("endisset", compile_endif);
        directives.register("endempty", compile_endif);

        // Loops
        directives.register("for", compile_for);
        directives.register("endfor", compile_endfor);
        directives.register("foreach", compile_foreach);
        directives.register("endforeach", compile_endforeach);
        directives.register("while", compile_while);
        directives.register("endwhile", compile_endwhile);
        directives.register("forelse", compile_forelse);
        directives.register("empty", compile_empty);
        directives.register("endforelse", compile_endif);
        directives.register("break", compile_break);
        directives.register("continue", compile_continue);

        // Inheritance and sections
        directives.register("extends", compile_extends);
        directives.register("include", compile_include);
        directives.register("each", compile_each);
        directives.register("yield", compile_yield);
        directives.register("hasSection", compile_has_section);
        directives.register("section", compile_section);
        directives.register("endsection", compile_endsection);
        directives.register("stop", compile_endsection);
        directives.register("overwrite", compile_overwrite);
        directives.register("show", compile_show);
        directives.register("append", compile_append);

        // Stacks
        directives.register("push", compile_section);
        directives.register("endpush", compile_append);
        directives.register("stack", compile_yield);

        // Authorization
        directives.register("can", compile_can);
        directives.register("cannot", compile_cannot);
        directives.register("endcan", compile_endif);
        directives.register("endcannot", compile_endif);

        // Raw PHP and helpers
        directives.register("php", compile_php);
        directives.register("unset", compile_unset);
        directives.register("lang", compile_lang);
        directives.register("choice", compile_choice);

        directives
    }

    /// Register or replace the handler for `@name`
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(Option<&str>, &mut CompileState) -> Result<String> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(handler));
    }

    pub fn get(&self, name: &str) -> Option<&DirectiveHandler> {
        self.handlers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Directive names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

fn expr(expression: Option<&str>) -> &str {
    expression.unwrap_or("")
}

/// Drop the outer parentheses of an argument list
pub fn strip_parens(expression: &str) -> &str {
    let trimmed = expression.trim();
    match trimmed.strip_prefix('(') {
        Some(inner) => inner.strip_suffix(')').unwrap_or(inner),
        None => trimmed,
    }
}

/// Arguments present and not just `()`
fn has_arguments(expression: Option<&str>) -> bool {
    expression
        .map(|e| !strip_parens(e).trim().is_empty())
        .unwrap_or(false)
}

fn render_call(view: &str) -> String {
    RENDER_CALL.replace("%s", view)
}

fn compile_if(expression: Option<&str>, _: &mut CompileState) -> Result<String> {
    Ok(format!("<?php if{}: ?>", expr(expression)))
}

fn compile_elseif(expression: Option<&str>, _: &mut CompileState) -> Result<String> {
    Ok(format!("<?php elseif{}: ?>", expr(expression)))
}

fn compile_else(_: Option<&str>, _: &mut CompileState) -> Result<String> {
    Ok("<?php else: ?>".to_string())
}

fn compile_endif(_: Option<&str>, _: &mut CompileState) -> Result<String> {
    Ok("<?php endif; ?>".to_string())
}

fn compile_unless(expression: Option<&str>, _: &mut CompileState) -> Result<String> {
    Ok(format!("<?php if ( ! {}): ?>", expr(expression)))
}

fn compile_isset(expression: Option<&str>, _: &mut CompileState) -> Result<String> {
    Ok(format!("<?php if(isset{}): ?>", expr(expression)))
}

fn compile_for(expression: Option<&str>, _: &mut CompileState) -> Result<String> {
    Ok(format!("<?php for{}: ?>", expr(expression)))
}

fn compile_endfor(_: Option<&str>, _: &mut CompileState) -> Result<String> {
    Ok("<?php endfor; ?>".to_string())
}

fn compile_foreach(expression: Option<&str>, _: &mut CompileState) -> Result<String> {
    Ok(format!("<?php foreach{}: ?>", expr(expression)))
}

fn compile_endforeach(_: Option<&str>, _: &mut CompileState) -> Result<String> {
    Ok("<?php endforeach; ?>".to_string())
}

fn compile_while(expression: Option<&str>, _: &mut CompileState) -> Result<String> {
    Ok(format!("<?php while{}: ?>", expr(expression)))
}

fn compile_endwhile(_: Option<&str>, _: &mut CompileState) -> Result<String> {
    Ok("<?php endwhile; ?>".to_string())
}

fn compile_forelse(expression: Option<&str>, state: &mut CompileState) -> Result<String> {
    let empty = format!("$__empty_{}", state.open_forelse());
    Ok(format!(
        "<?php {0} = true; foreach{1}: {0} = false; ?>",
        empty,
        expr(expression)
    ))
}

/// `@empty` closes a forelse loop; `@empty($x)` is an emptiness conditional
fn compile_empty(expression: Option<&str>, state: &mut CompileState) -> Result<String> {
    if has_arguments(expression) {
        return Ok(format!("<?php if(empty{}): ?>", expr(expression)));
    }

    let empty = format!("$__empty_{}", state.close_forelse()?);
    Ok(format!("<?php endforeach; if ({}): ?>", empty))
}

fn compile_break(expression: Option<&str>, _: &mut CompileState) -> Result<String> {
    match expression {
        Some(condition) if has_arguments(expression) => {
            Ok(format!("<?php if{} break; ?>", condition))
        }
        _ => Ok("<?php break; ?>".to_string()),
    }
}

fn compile_continue(expression: Option<&str>, _: &mut CompileState) -> Result<String> {
    match expression {
        Some(condition) if has_arguments(expression) => {
            Ok(format!("<?php if{} continue; ?>", condition))
        }
        _ => Ok("<?php continue; ?>".to_string()),
    }
}

/// The parent render runs from the footer, after every section is filled
fn compile_extends(expression: Option<&str>, state: &mut CompileState) -> Result<String> {
    let view = strip_parens(expr(expression));
    state.push_footer(render_call(view));
    Ok(String::new())
}

fn compile_include(expression: Option<&str>, _: &mut CompileState) -> Result<String> {
    Ok(render_call(strip_parens(expr(expression))))
}

fn compile_each(expression: Option<&str>, _: &mut CompileState) -> Result<String> {
    Ok(format!("<?php echo $__env->renderEach{}; ?>", expr(expression)))
}

fn compile_yield(expression: Option<&str>, _: &mut CompileState) -> Result<String> {
    Ok(format!("<?php echo $__env->yieldContent{}; ?>", expr(expression)))
}

fn compile_has_section(expression: Option<&str>, _: &mut CompileState) -> Result<String> {
    Ok(format!(
        "<?php if (! empty(trim($__env->yieldContent{}))): ?>",
        expr(expression)
    ))
}

fn compile_section(expression: Option<&str>, _: &mut CompileState) -> Result<String> {
    Ok(format!("<?php $__env->startSection{}; ?>", expr(expression)))
}

fn compile_endsection(_: Option<&str>, _: &mut CompileState) -> Result<String> {
    Ok("<?php $__env->stopSection(); ?>".to_string())
}

fn compile_overwrite(_: Option<&str>, _: &mut CompileState) -> Result<String> {
    Ok("<?php $__env->stopSection(true); ?>".to_string())
}

fn compile_show(_: Option<&str>, _: &mut CompileState) -> Result<String> {
    Ok("<?php echo $__env->yieldSection(); ?>".to_string())
}

fn compile_append(_: Option<&str>, _: &mut CompileState) -> Result<String> {
    Ok("<?php $__env->appendSection(); ?>".to_string())
}

fn compile_can(expression: Option<&str>, _: &mut CompileState) -> Result<String> {
    Ok(format!("<?php if (Gate::check{}): ?>", expr(expression)))
}

fn compile_cannot(expression: Option<&str>, _: &mut CompileState) -> Result<String> {
    Ok(format!("<?php if (Gate::denies{}): ?>", expr(expression)))
}

/// Inline `@php($x = 1)`; a bare `@php` without `@endphp` stays as text
fn compile_php(expression: Option<&str>, _: &mut CompileState) -> Result<String> {
    match expression {
        Some(statement) => Ok(format!("<?php {}; ?>", statement)),
        None => Ok("@php".to_string()),
    }
}

fn compile_unset(expression: Option<&str>, _: &mut CompileState) -> Result<String> {
    Ok(format!("<?php unset{}; ?>", expr(expression)))
}

fn compile_lang(expression: Option<&str>, _: &mut CompileState) -> Result<String> {
    Ok(format!("<?php echo \\Lang::get{}; ?>", expr(expression)))
}

fn compile_choice(expression: Option<&str>, _: &mut CompileState) -> Result<String> {
    Ok(format!("<?php echo \\Lang::choice{}; ?>", expr(expression)))
}
