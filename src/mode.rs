//! Editing mode state machine
//!
//! Tracks whether the surface shows the plain source editor or one of the
//! rich renderers, and produces the engine directives that carry a switch out
//! to the surface. The machine never touches the surface itself.

use serde::{Deserialize, Serialize};

/// Rich renderers offered by the editing engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RichMode {
    /// Instant rendering (markdown rendered in place as you type)
    #[default]
    Ir,
    /// What-you-see-is-what-you-get
    Wysiwyg,
    /// Split view: source with a live preview pane
    Sv,
}

impl RichMode {
    pub const ALL: [RichMode; 3] = [RichMode::Ir, RichMode::Wysiwyg, RichMode::Sv];

    fn renderer(self) -> Renderer {
        match self {
            Self::Ir => Renderer::Ir,
            Self::Wysiwyg => Renderer::Wysiwyg,
            Self::Sv => Renderer::Sv,
        }
    }
}

/// Renderer/container addressed by a directive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Renderer {
    Ir,
    Wysiwyg,
    Sv,
    /// Plain text source editor
    Plain,
}

/// When the split view shows its preview pane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewMode {
    /// Editor and preview side by side
    #[default]
    Both,
    /// Editor only
    Editor,
}

/// One instruction for the editing engine running inside the surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum EngineDirective {
    /// Allow or prevent input in a renderer
    EnableRenderer { renderer: Renderer, enabled: bool },
    /// Show or hide a renderer's DOM container
    ShowContainer { renderer: Renderer, visible: bool },
    /// Show or hide the split view preview pane
    ShowPreview { visible: bool },
    /// Replace the active renderer's text
    SetValue { content: String },
    /// Toggle the source-mode class on the surface root
    SourceClass { active: bool },
    /// Highlight the source-mode toolbar affordance
    Affordance { active: bool },
}

/// Externally visible mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Rich(RichMode),
    Source,
}

/// Result of a state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub directives: Vec<EngineDirective>,
    /// Whether the persisted options should be rewritten
    pub persist: bool,
}

/// Source/rich mode state for one surface session
#[derive(Debug, Clone)]
pub struct ModeMachine {
    /// Rich mode the engine is in, or was in before source mode
    rich: RichMode,
    source_active: bool,
    /// Only written on the transition into source mode
    previous_rich: Option<RichMode>,
    preview_mode: PreviewMode,
}

impl ModeMachine {
    pub fn new(initial: RichMode, preview_mode: PreviewMode) -> Self {
        Self {
            rich: initial,
            source_active: false,
            previous_rich: None,
            preview_mode,
        }
    }

    pub fn mode(&self) -> Mode {
        if self.source_active {
            Mode::Source
        } else {
            Mode::Rich(self.rich)
        }
    }

    pub fn is_source(&self) -> bool {
        self.source_active
    }

    pub fn rich_mode(&self) -> RichMode {
        self.rich
    }

    pub fn previous_rich(&self) -> Option<RichMode> {
        self.previous_rich
    }

    /// Switch to the plain source editor. `None` when already there.
    pub fn enter(&mut self, content: &str) -> Option<Transition> {
        if self.source_active {
            return None;
        }
        self.previous_rich = Some(self.rich);
        self.source_active = true;

        let mut directives = Vec::with_capacity(12);
        for mode in RichMode::ALL {
            directives.push(EngineDirective::EnableRenderer {
                renderer: mode.renderer(),
                enabled: false,
            });
        }
        directives.push(EngineDirective::EnableRenderer {
            renderer: Renderer::Plain,
            enabled: true,
        });
        for mode in RichMode::ALL {
            directives.push(EngineDirective::ShowContainer {
                renderer: mode.renderer(),
                visible: false,
            });
        }
        directives.push(EngineDirective::ShowPreview { visible: false });
        directives.push(EngineDirective::ShowContainer {
            renderer: Renderer::Plain,
            visible: true,
        });
        directives.push(EngineDirective::SetValue {
            content: content.to_string(),
        });
        directives.push(EngineDirective::SourceClass { active: true });
        directives.push(EngineDirective::Affordance { active: true });

        tracing::debug!("Entered source mode from {:?}", self.rich);
        Some(Transition {
            directives,
            persist: true,
        })
    }

    /// Leave source mode for `target`, else the remembered mode, else IR.
    /// `None` when not in source mode.
    pub fn exit(&mut self, target: Option<RichMode>, content: &str) -> Option<Transition> {
        if !self.source_active {
            return None;
        }
        let resolved = target.or(self.previous_rich).unwrap_or_default();
        self.source_active = false;
        self.rich = resolved;

        let mut directives = vec![
            EngineDirective::EnableRenderer {
                renderer: Renderer::Plain,
                enabled: false,
            },
            EngineDirective::ShowContainer {
                renderer: Renderer::Plain,
                visible: false,
            },
            EngineDirective::EnableRenderer {
                renderer: resolved.renderer(),
                enabled: true,
            },
            EngineDirective::ShowContainer {
                renderer: resolved.renderer(),
                visible: true,
            },
        ];
        if resolved == RichMode::Sv {
            directives.push(EngineDirective::ShowPreview {
                visible: self.preview_mode == PreviewMode::Both,
            });
        }
        directives.push(EngineDirective::SetValue {
            content: content.to_string(),
        });
        directives.push(EngineDirective::SourceClass { active: false });
        directives.push(EngineDirective::Affordance { active: false });

        tracing::debug!("Exited source mode to {:?}", resolved);
        Some(Transition {
            directives,
            persist: true,
        })
    }

    pub fn toggle(&mut self, content: &str) -> Option<Transition> {
        if self.source_active {
            self.exit(None, content)
        } else {
            self.enter(content)
        }
    }

    /// A rich-mode button was pressed inside the surface.
    ///
    /// Leaving source mode here only clears the source class and affordance;
    /// the button's own handler in the surface performs the renderer switch.
    pub fn select_rich(&mut self, mode: RichMode) -> Option<Transition> {
        let was_source = self.source_active;
        self.rich = mode;
        if !was_source {
            return None;
        }
        self.source_active = false;
        tracing::debug!("Source mode cleared by {:?} button", mode);
        Some(Transition {
            directives: vec![
                EngineDirective::SourceClass { active: false },
                EngineDirective::Affordance { active: false },
            ],
            persist: true,
        })
    }
}

impl Default for ModeMachine {
    fn default() -> Self {
        Self::new(RichMode::default(), PreviewMode::default())
    }
}
