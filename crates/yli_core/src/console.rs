//! Console line processing
//!
//! A console owns the commands bound to it, an output buffer and a history of
//! accepted lines. [`Universe::process_line`] is the whole read-eval-print
//! step: tokenize, dispatch, render the result into the output buffer.

use tracing::debug;

use crate::entity::{ConsoleData, EntityId, EntityKind};
use crate::lisp::Invocation;
use crate::registry::common_prefix;
use crate::universe::Universe;
use crate::value::TypedValue;

/// Split a command line on whitespace
pub fn tokenize(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

impl Universe {
    fn console_data(&self, console: EntityId) -> Option<&ConsoleData> {
        self.entities.get(console)?.data.as_console()
    }

    /// Console state, `None` if `console` is dead or not a console
    fn live_console_mut(&mut self, console: EntityId) -> Option<&mut ConsoleData> {
        let node = self.entities.get_mut(console)?;
        if !node.alive {
            return None;
        }
        node.data.as_console_mut()
    }

    // =========================================================================
    // BUFFERS
    // =========================================================================

    /// Lines printed to `console` and not yet taken
    pub fn console_output(&self, console: EntityId) -> &[String] {
        self.console_data(console)
            .map(|data| data.output.as_slice())
            .unwrap_or_default()
    }

    /// Accepted command lines, oldest first
    pub fn console_history(&self, console: EntityId) -> &[String] {
        self.console_data(console)
            .map(|data| data.history.as_slice())
            .unwrap_or_default()
    }

    pub fn console_prompt(&self, console: EntityId) -> &str {
        self.console_data(console)
            .map_or("", |data| data.prompt.as_str())
    }

    pub fn set_console_prompt(&mut self, console: EntityId, prompt: &str) {
        if let Some(data) = self.live_console_mut(console) {
            data.prompt = prompt.to_string();
        }
    }

    /// Append `text` to the output buffer, one entry per line
    pub fn print_to_console(&mut self, console: EntityId, text: &str) {
        if let Some(data) = self.live_console_mut(console) {
            data.output.extend(text.lines().map(str::to_string));
        }
    }

    pub fn clear_console(&mut self, console: EntityId) {
        if let Some(data) = self.live_console_mut(console) {
            data.output.clear();
        }
    }

    /// Drain the output buffer
    pub fn take_console_output(&mut self, console: EntityId) -> Vec<String> {
        self.live_console_mut(console)
            .map(|data| std::mem::take(&mut data.output))
            .unwrap_or_default()
    }

    // =========================================================================
    // PROCESSING
    // =========================================================================

    /// Run one command line on `console`
    ///
    /// Blank lines are ignored. Other lines are added to the history and
    /// dispatched; a returned value is printed to the output buffer. Unknown
    /// commands and arguments no overload accepts are reported there too.
    pub fn process_line(&mut self, console: EntityId, line: &str) -> Option<TypedValue> {
        let tokens = tokenize(line);
        let (name, params) = tokens.split_first()?;

        let data = self.live_console_mut(console)?;
        data.history.push(line.trim().to_string());

        let Some(function) = self.command(console, name) else {
            debug!(command = %name, "unknown command");
            self.print_to_console(console, &format!("unknown command: {name}"));
            return None;
        };

        match self.invoke_lisp_function(function, params) {
            Invocation::Returned(Some(value)) => {
                let text = self.format_value(&value);
                self.print_to_console(console, &text);
                Some(value)
            }
            Invocation::Returned(None) => None,
            Invocation::Mismatch => {
                let usage = self.usage(name, function);
                self.print_to_console(console, &usage);
                None
            }
        }
    }

    /// `usage: name A B | name C` for every overload of `function`
    pub fn usage(&self, name: &str, function: EntityId) -> String {
        let forms: Vec<String> = self
            .overload_signatures(function)
            .iter()
            .map(|signature| {
                std::iter::once(name)
                    .chain(signature.iter().copied())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();
        format!("usage: {}", forms.join(" | "))
    }

    // =========================================================================
    // COMPLETION
    // =========================================================================

    /// Longest common extension of the command names on `console` that start
    /// with `prefix`; `prefix` itself if none do
    pub fn complete_command(&self, console: EntityId, prefix: &str) -> String {
        let Some(node) = self.entity(console) else {
            return prefix.to_string();
        };
        let matches = node
            .registry()
            .iter()
            .filter(|(name, id)| {
                name.starts_with(prefix) && self.kind(*id) == Some(EntityKind::LispFunction)
            })
            .map(|(name, _)| name);
        common_prefix(matches).unwrap_or(prefix).to_string()
    }

    /// Longest common extension of the global names that start with `prefix`
    pub fn complete_entity(&self, prefix: &str) -> String {
        self.entity(self.root())
            .map(|root| root.registry().complete(prefix))
            .unwrap_or_else(|| prefix.to_string())
    }
}
