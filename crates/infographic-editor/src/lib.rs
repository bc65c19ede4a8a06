#![warn(missing_docs)]
//! Infographic Editor - Headless Editing Runtime for SVG Infographics
//!
//! # Overview
//!
//! `infographic-editor` is the editing kernel that sits behind a rendered SVG
//! infographic. It owns the live options model, mutates it with structured change
//! notification, keeps an undo/redo history, keeps host attributes (`viewBox`,
//! padding) in sync with the model, and arbitrates the pointer and keyboard gestures
//! that edit it. It renders nothing itself: the host surface is reached through the
//! [`HostSurface`] trait.
//!
//! # Core Features
//!
//! - **Merge-with-delete**: deep option updates where `Unset` deletes at any depth
//! - **State Tracking**: one mutator, typed change events and a version counter
//! - **Undo/Redo**: reversible commands, batches, bounded history with a clean point
//! - **View Sync**: path-keyed handlers with a same-path recursion guard
//! - **Gesture Arbitration**: a single exclusive lock, concurrent tokens, selection
//! - **Pan & Zoom**: space-bar drag and modifier+wheel zoom, one undo step per gesture
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Editor facade (composition root)           │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Interactions (DragCanvas, ZoomWheel, ...)  │  ← Host input
//! ├─────────────────────────────────────────────┤
//! │  InteractionManager (locks + selection)     │  ← Arbitration
//! ├─────────────────────────────────────────────┤
//! │  CommandManager (undo/redo)                 │  ← History
//! ├─────────────────────────────────────────────┤
//! │  StateManager ──events──▶ SyncRegistry      │  ← Model & view sync
//! ├─────────────────────────────────────────────┤
//! │  merge / viewport                           │  ← Utilities
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use infographic_editor::{EventBus, StateManager};
//! use infographic_editor::merge::UpdateMap;
//! use serde_json::json;
//!
//! let state = StateManager::new(json!({ "padding": 8, "viewBox": "0 0 100 100" }), EventBus::new());
//! state.subscribe(|event| println!("{}", event.topic()));
//!
//! state.update_options(&UpdateMap::new().unset("viewBox").set("padding", json!([4, 8])));
//! assert_eq!(state.value_at("viewBox"), None);
//! assert_eq!(state.value_at("padding"), Some(json!([4, 8])));
//! ```
//!
//! # Module Description
//!
//! - [`merge`] - Deep merge-with-delete and path helpers
//! - [`state`] - Options model and its mutation API
//! - [`commands`] - Undoable commands and the history
//! - [`sync`] - Path-keyed view synchronization
//! - [`interaction`] - Input events, arbitration and built-in gestures
//! - [`viewport`] - viewBox, padding and coordinate transforms
//! - [`editor`] - The composition root

pub mod commands;
pub mod config;
pub mod editor;
pub mod events;
pub mod host;
pub mod interaction;
pub mod merge;
pub mod state;
pub mod sync;
pub mod viewport;

pub use commands::{
    AddItemCommand, BatchCommand, Command, CommandError, CommandManager, HistoryState,
    RemoveItemCommand, UpdateDataCommand, UpdateElementCommand, UpdateItemCommand,
    UpdateOptionsCommand,
};
pub use config::{EditorConfig, InteractionFlags};
pub use editor::{Editor, EditorBuilder, EditorContext, EditorError, Plugin};
pub use events::{ChangeOp, ChangeRecord, EditorEvent, EventBus, OptionsChange, SubscriptionId};
pub use host::{Cursor, ElementRef, HostSurface, NodeId};
pub use interaction::{
    DragCanvas, EventTarget, InputEvent, Interaction, InteractionManager, KeyEvent, PanPhase,
    PointerEvent, SelectMode, SelectionChange, WheelEvent, ZoomWheel,
};
pub use merge::{OptionUpdate, UpdateMap, apply_option_updates};
pub use state::{ElementRole, ElementTarget, StateError, StateManager};
pub use sync::{SyncHandle, SyncOptions, SyncRegistry};
pub use viewport::{Padding, ViewBox, client_to_viewport, viewport_to_client};
