//! Command types for the Elm-style architecture
//!
//! Commands represent side effects the runtime performs after the panel
//! manager handles a message. The library never posts to the surface, opens
//! URLs or shows dialogs itself.

use std::path::PathBuf;

use crate::messages::HostMsg;

/// Commands returned by the panel manager
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Cmd {
    /// No command - do nothing
    #[default]
    None,
    /// Deliver a message to the surface
    Post(HostMsg),
    /// Change the panel title (dirty indicator)
    SetTitle(String),
    /// Non-fatal message for the user
    ShowInfo(String),
    /// Error for the user; the triggering operation was aborted
    ShowError(String),
    /// Open an external URL in the default browser
    OpenUrl(String),
    /// Open a local file (already validated against the workspace root)
    OpenFile(PathBuf),
    /// Hand a contained local file the surface cannot edit to the system
    OpenPath(PathBuf),
    /// Bring the existing panel to the front
    Reveal,
    /// Execute multiple commands
    Batch(Vec<Cmd>),
}

impl Cmd {
    /// Create a batch of commands, dropping `None`s
    pub fn batch(cmds: Vec<Cmd>) -> Self {
        let mut cmds: Vec<Cmd> = cmds.into_iter().filter(|c| !c.is_none()).collect();
        match cmds.len() {
            0 => Cmd::None,
            1 => cmds.remove(0),
            _ => Cmd::Batch(cmds),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Cmd::None)
    }

    /// Flatten nested batches into execution order
    pub fn flatten(self) -> Vec<Cmd> {
        match self {
            Cmd::None => Vec::new(),
            Cmd::Batch(cmds) => cmds.into_iter().flat_map(Cmd::flatten).collect(),
            other => vec![other],
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Cmd::ShowError(message.into())
    }
}

impl From<HostMsg> for Cmd {
    fn from(msg: HostMsg) -> Self {
        Cmd::Post(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_collapses() {
        assert_eq!(Cmd::batch(vec![Cmd::None, Cmd::None]), Cmd::None);
        assert_eq!(Cmd::batch(vec![Cmd::None, Cmd::Reveal]), Cmd::Reveal);
        assert!(matches!(
            Cmd::batch(vec![Cmd::Reveal, Cmd::error("x")]),
            Cmd::Batch(_)
        ));
    }

    #[test]
    fn test_flatten_preserves_order() {
        let cmd = Cmd::Batch(vec![
            Cmd::ShowInfo("a".to_string()),
            Cmd::Batch(vec![Cmd::ShowInfo("b".to_string()), Cmd::None]),
            Cmd::ShowInfo("c".to_string()),
        ]);
        assert_eq!(
            cmd.flatten(),
            vec![
                Cmd::ShowInfo("a".to_string()),
                Cmd::ShowInfo("b".to_string()),
                Cmd::ShowInfo("c".to_string()),
            ]
        );
    }
}
