//! `CALL_FUNCTION` and `RETURN`.

use blockscript_lang::{BlockKind, CallFunctionParams, ReturnParams, Value};

use crate::context::ExecutionContext;
use crate::error::{ScriptError, ScriptResult};
use crate::ops::args::{Argument, split_arguments};
use crate::resolve::Resolver;
use crate::result::ExecutionResult;
use crate::value::RuntimeValue;

use super::Interpreter;

impl Interpreter<'_> {
    pub(super) fn call(
        &mut self,
        params: &CallFunctionParams,
        ctx: &mut ExecutionContext,
    ) -> ExecutionResult {
        match self.try_call(params, ctx) {
            Ok(result) => result,
            Err(e) => e.into(),
        }
    }

    fn try_call(
        &mut self,
        params: &CallFunctionParams,
        ctx: &mut ExecutionContext,
    ) -> ScriptResult<ExecutionResult> {
        let name = params.function.trim();
        if ctx.call_depth() >= self.config.max_call_depth {
            return Err(ScriptError::bounds(format!(
                "call depth limit of {} reached calling '{name}'",
                self.config.max_call_depth
            )));
        }
        let table = ctx.function_table();
        let function = table
            .get(name)
            .ok_or_else(|| ScriptError::reference(format!("unknown function '{name}'")))?;
        let BlockKind::Function(definition) = function.kind() else {
            return Err(ScriptError::state(format!("'{name}' is not a function")));
        };

        let arguments = split_arguments(&params.arguments);
        if arguments.len() != definition.parameters.len() {
            return Err(ScriptError::state(format!(
                "function '{name}' takes {} argument(s), got {}",
                definition.parameters.len(),
                arguments.len()
            )));
        }
        let values = {
            let resolver = Resolver::new(ctx, &*self.host);
            arguments
                .iter()
                .map(|argument| evaluate_argument(&resolver, argument))
                .collect::<ScriptResult<Vec<_>>>()?
        };

        let mut callee = ctx.child_for_call();
        for (parameter, value) in definition.parameters.iter().zip(values) {
            callee.set(parameter.clone(), value);
        }
        tracing::debug!("Calling '{}' at depth {}", name, callee.call_depth());

        let returned = match self.execute_children(function.children(), &mut callee) {
            ExecutionResult::Error(e) => return Ok(ExecutionResult::Error(e)),
            ExecutionResult::Return(value) => value,
            ExecutionResult::Success | ExecutionResult::Break | ExecutionResult::Continue => None,
        };
        ctx.merge_back(callee);

        if let Some(result) = params.result.as_deref().filter(|r| !r.trim().is_empty()) {
            let result = Resolver::new(ctx, &*self.host).variable_name(result);
            match returned {
                Some(value) => ctx.set(result, value),
                None => ctx.clear(&result),
            }
        }
        Ok(ExecutionResult::Success)
    }

    pub(super) fn return_value(
        &self,
        params: &ReturnParams,
        ctx: &ExecutionContext,
    ) -> ExecutionResult {
        match Resolver::new(ctx, &*self.host).resolve_opt(params.value.as_ref()) {
            Ok(RuntimeValue::None) => ExecutionResult::Return(None),
            Ok(value) => ExecutionResult::Return(Some(value)),
            Err(e) => e.into(),
        }
    }
}

/// Quoted arguments are text templates. Bare ones are numbers, whole `{variable}` references
/// that keep their type, or templates.
fn evaluate_argument(resolver: &Resolver<'_>, argument: &Argument) -> ScriptResult<RuntimeValue> {
    match argument {
        Argument::Quoted(text) => Ok(RuntimeValue::Text(resolver.substitute(text))),
        Argument::Bare(raw) => match raw.parse::<f64>() {
            Ok(n) => Ok(RuntimeValue::Number(n)),
            Err(_) => resolver.resolve(&Value::text(raw.as_str())),
        },
    }
}
