// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Relabelling the enter key for the focused editor's action.

use crate::keyboard::Keyboard;
use crate::types::IconRef;

/// Editor options word, as reported by the host's text field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ImeOptions(pub u32);

impl ImeOptions {
    /// Bits carrying the editor action.
    pub const MASK_ACTION: u32 = 0xff;
    /// The editor asked for no enter action.
    pub const FLAG_NO_ENTER_ACTION: u32 = 0x4000_0000;
    /// Action code for "go".
    pub const ACTION_GO: u32 = 2;
    /// Action code for "search".
    pub const ACTION_SEARCH: u32 = 3;
    /// Action code for "send".
    pub const ACTION_SEND: u32 = 4;
    /// Action code for "next".
    pub const ACTION_NEXT: u32 = 5;

    /// The action the enter key should perform.
    ///
    /// Setting [`FLAG_NO_ENTER_ACTION`](Self::FLAG_NO_ENTER_ACTION) keeps those bits
    /// in the masked value, so any action combined with it falls back to
    /// [`EnterAction::Enter`].
    pub const fn enter_action(self) -> EnterAction {
        match self.0 & (Self::MASK_ACTION | Self::FLAG_NO_ENTER_ACTION) {
            Self::ACTION_GO => EnterAction::Go,
            Self::ACTION_SEARCH => EnterAction::Search,
            Self::ACTION_SEND => EnterAction::Send,
            Self::ACTION_NEXT => EnterAction::Next,
            _ => EnterAction::Enter,
        }
    }
}

/// What the enter key shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnterAction {
    /// Navigate.
    Go,
    /// Move to the next field.
    Next,
    /// Run a search.
    Search,
    /// Send a message.
    Send,
    /// Plain line feed.
    Enter,
}

/// User-visible strings and icons for the enter key, usually localized by the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnterKeyLabels {
    /// Label for [`EnterAction::Go`].
    pub go: String,
    /// Label for [`EnterAction::Next`].
    pub next: String,
    /// Label for [`EnterAction::Send`].
    pub send: String,
    /// Icon for [`EnterAction::Search`].
    pub search_icon: IconRef,
    /// Icon for [`EnterAction::Enter`].
    pub enter_icon: IconRef,
}

impl Default for EnterKeyLabels {
    fn default() -> Self {
        Self {
            go: "Go".into(),
            next: "Next".into(),
            send: "Send".into(),
            search_icon: IconRef::new("ic_key_search"),
            enter_icon: IconRef::new("ic_key_enter"),
        }
    }
}

impl Keyboard {
    /// Relabel the enter key for the editor's action.
    ///
    /// Text actions clear both icons and set a label; search and plain enter set an
    /// icon and clear the label, leaving the preview icon as it was. Does nothing
    /// when the keyboard has no enter key.
    pub fn set_ime_options(&mut self, options: ImeOptions, labels: &EnterKeyLabels) {
        let Some(key) = self.enter_key.and_then(|index| self.keys.get_mut(index)) else {
            return;
        };
        let action = options.enter_action();
        tracing::trace!(?action, "relabelling enter key");
        let text = match action {
            EnterAction::Go => &labels.go,
            EnterAction::Next => &labels.next,
            EnterAction::Send => &labels.send,
            EnterAction::Search => {
                key.icon = Some(labels.search_icon.clone());
                key.label = None;
                return;
            }
            EnterAction::Enter => {
                key.icon = Some(labels.enter_icon.clone());
                key.label = None;
                return;
            }
        };
        key.icon = None;
        key.icon_preview = None;
        key.label = Some(text.clone());
    }
}
