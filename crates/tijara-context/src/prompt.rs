// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A prompt as an ordered list of named sections.
//!
//! Sections always render in [`SectionKind`] order regardless of the order
//! they were added in; sections of the same kind keep insertion order.

use strum::{Display, EnumIter, IntoEnumIterator};

/// Named prompt sections, declared in render order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum SectionKind {
    Personality,
    ResponseRules,
    Memory,
    RetrievedData,
    PatternGuidance,
    Message,
}

impl SectionKind {
    pub fn heading(self) -> &'static str {
        match self {
            SectionKind::Personality => "Personality",
            SectionKind::ResponseRules => "Response rules",
            SectionKind::Memory => "Conversation so far",
            SectionKind::RetrievedData => "Store data",
            SectionKind::PatternGuidance => "Learned guidance",
            SectionKind::Message => "Customer message",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSection {
    pub kind: SectionKind,
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prompt {
    sections: Vec<PromptSection>,
}

impl Prompt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a section. Blank bodies are ignored.
    pub fn push(&mut self, kind: SectionKind, body: impl Into<String>) {
        let body = body.into();
        if body.trim().is_empty() {
            return;
        }
        self.sections.push(PromptSection { kind, body });
    }

    #[must_use]
    pub fn with(mut self, kind: SectionKind, body: impl Into<String>) -> Self {
        self.push(kind, body);
        self
    }

    /// Replaces every section of `kind` with a single new body.
    pub fn replace(&mut self, kind: SectionKind, body: impl Into<String>) {
        self.sections.retain(|s| s.kind != kind);
        self.push(kind, body);
    }

    /// Concatenated body of every section of `kind`.
    pub fn text_of(&self, kind: SectionKind) -> String {
        self.sections
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| s.body.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn sections(&self) -> impl Iterator<Item = &PromptSection> {
        SectionKind::iter().flat_map(move |kind| self.sections.iter().filter(move |s| s.kind == kind))
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Renders the prompt deterministically, one `## heading` block per kind.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for kind in SectionKind::iter() {
            let body = self.text_of(kind);
            if body.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str("## ");
            out.push_str(kind.heading());
            out.push('\n');
            out.push_str(body.trim_end());
            out.push('\n');
        }
        out
    }
}
