//! The editor facade: composition root of one editing session.
//!
//! [`Editor`] owns the event bus, the state manager, the command manager, the sync
//! registry, the interaction manager and every attached plugin and interaction.
//! Building it registers the core view syncs (`viewBox` and `padding`) and routes
//! every options change to the sync registry; destroying it tears everything down
//! in reverse order.
//!
//! # Example
//!
//! ```rust,ignore
//! let editor = Editor::new(host, json!({ "viewBox": "0 0 800 600" }), EditorConfig::default())?;
//! editor.dispatch(&InputEvent::PointerEnter);
//! ```

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::commands::{Command, CommandError, CommandManager};
use crate::config::EditorConfig;
use crate::events::{EditorEvent, EventBus, SubscriptionId};
use crate::host::HostSurface;
use crate::interaction::{DragCanvas, InputEvent, Interaction, InteractionManager, ZoomWheel};
use crate::state::StateManager;
use crate::sync::{SyncHandle, SyncOptions, SyncRegistry};
use crate::viewport::Padding;

/// Editor construction error type
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    /// The host surface is not attached to a live document.
    #[error("host surface is not connected to a document")]
    HostDetached,
    /// The configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    /// The configuration values are inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Shared handles passed to plugins and interactions.
#[derive(Clone)]
pub struct EditorContext {
    /// The options model.
    pub state: StateManager,
    /// Undo/redo history.
    pub commander: CommandManager,
    /// Gesture arbitration and selection.
    pub interaction: InteractionManager,
    /// Path-keyed view synchronization.
    pub sync: SyncRegistry,
    /// The rendered SVG root.
    pub host: Rc<dyn HostSurface>,
    /// Session configuration.
    pub config: EditorConfig,
}

impl fmt::Debug for EditorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorContext")
            .field("state", &self.state)
            .field("commander", &self.commander)
            .field("interaction", &self.interaction)
            .field("sync", &self.sync)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// An editor extension with a lifecycle tied to the editor.
pub trait Plugin {
    /// Plugin name.
    fn name(&self) -> &'static str;

    /// Called once, after the core syncs are registered.
    fn init(&mut self, ctx: &EditorContext);

    /// Called once when the editor is destroyed.
    fn destroy(&mut self) {}
}

/// Builder for an [`Editor`] with plugins and extra interactions.
pub struct EditorBuilder {
    host: Rc<dyn HostSurface>,
    options: Value,
    config: EditorConfig,
    plugins: Vec<Box<dyn Plugin>>,
    interactions: Vec<Box<dyn Interaction>>,
}

impl EditorBuilder {
    /// Use `config` instead of the default configuration.
    pub fn config(mut self, config: EditorConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach a plugin. Plugins initialize in attachment order.
    pub fn plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    /// Attach an interaction after the built-in ones.
    pub fn interaction(mut self, interaction: impl Interaction + 'static) -> Self {
        self.interactions.push(Box::new(interaction));
        self
    }

    /// Build the editor.
    pub fn build(self) -> Result<Editor, EditorError> {
        Editor::assemble(self)
    }
}

/// One editing session over a rendered infographic.
pub struct Editor {
    context: EditorContext,
    events: EventBus,
    plugins: Vec<Box<dyn Plugin>>,
    interactions: Vec<Box<dyn Interaction>>,
    core_syncs: Vec<SyncHandle>,
    subscription: Option<SubscriptionId>,
    destroyed: bool,
}

impl fmt::Debug for Editor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plugins: Vec<&str> = self.plugins.iter().map(|p| p.name()).collect();
        let interactions: Vec<&str> = self.interactions.iter().map(|i| i.name()).collect();
        f.debug_struct("Editor")
            .field("context", &self.context)
            .field("plugins", &plugins)
            .field("interactions", &interactions)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

impl Editor {
    /// Create an editor with the built-in interactions enabled by `config`.
    pub fn new(host: Rc<dyn HostSurface>, options: Value, config: EditorConfig) -> Result<Self, EditorError> {
        Self::builder(host, options).config(config).build()
    }

    /// Start building an editor.
    pub fn builder(host: Rc<dyn HostSurface>, options: Value) -> EditorBuilder {
        EditorBuilder {
            host,
            options,
            config: EditorConfig::default(),
            plugins: Vec::new(),
            interactions: Vec::new(),
        }
    }

    fn assemble(builder: EditorBuilder) -> Result<Self, EditorError> {
        let EditorBuilder {
            host,
            options,
            config,
            mut plugins,
            interactions: extra,
        } = builder;

        if !host.is_connected() {
            return Err(EditorError::HostDetached);
        }
        config.validate()?;

        let events = EventBus::new();
        let state = StateManager::new(options, events.clone());
        let commander = CommandManager::with_max_history(state.clone(), config.max_history);
        let sync = SyncRegistry::new({
            let state = state.clone();
            move |path| state.value_at(path)
        });
        let interaction = InteractionManager::new(host.clone(), events.clone());

        let subscription = events.subscribe_reentrant({
            let sync = sync.clone();
            let state = state.clone();
            move |event| {
                if let EditorEvent::OptionsChange(change) = event {
                    route_options_change(&sync, &state, change);
                }
            }
        });
        let core_syncs = register_core_syncs(&sync, &host);

        let context = EditorContext {
            state,
            commander,
            interaction,
            sync,
            host,
            config,
        };

        let mut interactions: Vec<Box<dyn Interaction>> = Vec::new();
        if context.config.interactions.drag_canvas {
            interactions.push(Box::new(DragCanvas::new()));
        }
        if context.config.interactions.zoom_wheel {
            interactions.push(Box::new(ZoomWheel::new()));
        }
        interactions.extend(extra);

        for plugin in plugins.iter_mut() {
            tracing::debug!(plugin = plugin.name(), "initializing plugin");
            plugin.init(&context);
        }
        for interaction in interactions.iter_mut() {
            interaction.init(&context);
        }

        Ok(Self {
            context,
            events,
            plugins,
            interactions,
            core_syncs,
            subscription: Some(subscription),
            destroyed: false,
        })
    }

    /// Forward one host input event to every interaction, in attachment order.
    pub fn dispatch(&mut self, event: &InputEvent) {
        if self.destroyed {
            return;
        }
        for interaction in self.interactions.iter_mut() {
            interaction.handle(event, &self.context);
        }
    }

    /// Execute an undoable command.
    pub fn execute(&self, command: Box<dyn Command>) -> Result<(), CommandError> {
        self.context.commander.execute(command)
    }

    /// Undo the newest command.
    pub fn undo(&self) -> Result<(), CommandError> {
        self.context.commander.undo()
    }

    /// Redo the newest undone command.
    pub fn redo(&self) -> Result<(), CommandError> {
        self.context.commander.redo()
    }

    /// The options model.
    pub fn state(&self) -> &StateManager {
        &self.context.state
    }

    /// The undo/redo history.
    pub fn commander(&self) -> &CommandManager {
        &self.context.commander
    }

    /// The interaction manager.
    pub fn interaction(&self) -> &InteractionManager {
        &self.context.interaction
    }

    /// The sync registry.
    pub fn sync(&self) -> &SyncRegistry {
        &self.context.sync
    }

    /// The event bus.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Handles shared with plugins and interactions.
    pub fn context(&self) -> &EditorContext {
        &self.context
    }

    /// Whether [`destroy`](Self::destroy) has run.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Tear the session down: interactions, plugins, interaction manager, syncs,
    /// subscriptions. Safe to call more than once.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;

        for interaction in self.interactions.iter_mut().rev() {
            interaction.destroy(&self.context);
        }
        for plugin in self.plugins.iter_mut().rev() {
            plugin.destroy();
        }
        self.context.interaction.destroy();
        for handle in self.core_syncs.drain(..) {
            handle.unregister();
        }
        self.context.sync.destroy();
        if let Some(id) = self.subscription.take() {
            self.events.unsubscribe(id);
        }
        self.events.clear();
        tracing::debug!("editor destroyed");
    }
}

impl Drop for Editor {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn register_core_syncs(sync: &SyncRegistry, host: &Rc<dyn HostSurface>) -> Vec<SyncHandle> {
    let view_box = {
        let host = host.clone();
        sync.register(
            "viewBox",
            move |value, _| match value {
                Some(Value::String(view_box)) => host.set_attribute("viewBox", view_box),
                None | Some(Value::Null) => host.remove_attribute("viewBox"),
                Some(other) => tracing::warn!(value = %other, "viewBox option is not a string"),
            },
            SyncOptions::immediate(),
        )
    };

    let padding = {
        let host = host.clone();
        sync.register(
            "padding",
            move |value, _| match value {
                None => host.apply_padding(Padding::default()),
                Some(value) => match Padding::from_value(value) {
                    Some(padding) => host.apply_padding(padding),
                    None => tracing::warn!(%value, "ignoring malformed padding option"),
                },
            },
            SyncOptions::immediate(),
        )
    };

    vec![view_box, padding]
}

// Root updates re-run the padding sync even when padding itself did not change.
fn route_options_change(sync: &SyncRegistry, state: &StateManager, change: &crate::events::OptionsChange) {
    for entry in &change.diff {
        sync.trigger(&entry.path, entry.new_value.as_ref(), entry.old_value.as_ref());
    }

    let root_update = change.records.iter().any(|record| record.path.is_empty());
    let padding_synced = change.diff.iter().any(|entry| entry.path == "padding");
    if root_update
        && !padding_synced
        && let Some(padding) = state.value_at("padding")
    {
        sync.trigger("padding", Some(&padding), Some(&padding));
    }
}
