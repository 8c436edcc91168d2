//! Positional parameter binding.

use crate::error::ConsoleError;
use crate::literal::parse_int;
use crate::model::NodeCommand;
use crate::resolver::ResolvedCommand;

/// Bind `tokens` to the parameter slots of `resolved`, in order.
///
/// Binding is all-or-nothing: the first token that is not a literal, exceeds
/// the declared slot count, or does not fit its slot width aborts the whole
/// binding.
pub fn bind(resolved: ResolvedCommand<'_>, tokens: &[&str]) -> Result<NodeCommand, ConsoleError> {
    let mut command = NodeCommand::new(resolved.class, resolved.command);
    let slots = command.slots();
    let mut values = Vec::with_capacity(tokens.len());

    for (index, token) in tokens.iter().enumerate() {
        let value = parse_int(token).map_err(|_| ConsoleError::InvalidParam {
            index,
            token: (*token).to_string(),
        })?;
        let Some(slot) = slots.get(index) else {
            return Err(ConsoleError::TooManyParams {
                command: command.name().to_string(),
                slots: slots.len(),
                given: tokens.len(),
            });
        };
        let max = slot.width.max_value();
        if value > max {
            return Err(ConsoleError::ParamOutOfRange { index, value, max });
        }
        values.push(value);
    }

    command.set_values(values);
    Ok(command)
}
