//! Command registry: which handler serves which command id.
//!
//! The command set is closed, so the registry is a static table over
//! [`Command`] rather than anything registered at runtime. Unknown ids never get
//! this far; [`Command::from_id`] rejects them during frame validation.
use crate::protocol::Command;

/// Handler capability a command is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// Overwrites the numeric quad (supply rails, board temperature).
    NumericQuad,
    /// Overwrites the alpha triplet (gate, rack, PIR).
    AlphaTriplet,
    /// Relays the payload through the token bridge.
    TokenExchange,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CommandRegistry;

impl CommandRegistry {
    pub fn new() -> Self {
        Self
    }

    /// Handler for an already-resolved command.
    pub fn handler(&self, command: Command) -> Handler {
        match command {
            Command::Info => Handler::NumericQuad,
            Command::Sens => Handler::AlphaTriplet,
            Command::Tokn => Handler::TokenExchange,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_command_has_its_own_handler() {
        let registry = CommandRegistry::new();
        assert_eq!(registry.handler(Command::Info), Handler::NumericQuad);
        assert_eq!(registry.handler(Command::Sens), Handler::AlphaTriplet);
        assert_eq!(registry.handler(Command::Tokn), Handler::TokenExchange);
    }
}
