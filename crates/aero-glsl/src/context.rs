use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use crate::ir::{Decl, Function};
use crate::profile::Profile;
use crate::{GlslOptions, ProgramInputs};

/// A global declaration synthesized by a rewrite rule, emitted ahead of the program's own
/// elements.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SynthesizedGlobal {
    Variable(Decl),
    /// `layout(origin_upper_left) in vec4 gl_FragCoord;`
    FragCoordOriginUpperLeft,
}

/// Scratch state for one generation call.
///
/// Created fresh by every call and dropped when it returns, so name counters and synthesized
/// declarations never leak between calls or profiles.
#[derive(Debug)]
pub(crate) struct GenContext<'a> {
    pub(crate) profile: &'a Profile,
    pub(crate) options: GlslOptions,
    pub(crate) inputs: ProgramInputs,
    /// Whether the header declares the fragment color output.
    pub(crate) declares_frag_output: bool,
    counters: BTreeMap<&'static str, u32>,
    extensions: Vec<String>,
    globals: Vec<SynthesizedGlobal>,
    helpers: Vec<Function>,
    helper_keys: BTreeSet<String>,
    /// Program element indices of functions whose fragment coordinate is already reconstructed.
    reconstructed: BTreeSet<usize>,
}

impl<'a> GenContext<'a> {
    pub(crate) fn new(profile: &'a Profile, options: GlslOptions) -> Self {
        Self {
            profile,
            options,
            inputs: ProgramInputs::default(),
            declares_frag_output: false,
            counters: BTreeMap::new(),
            extensions: Vec::new(),
            globals: Vec::new(),
            helpers: Vec::new(),
            helper_keys: BTreeSet::new(),
            reconstructed: BTreeSet::new(),
        }
    }

    /// Returns `{prefix}{n}` with `n` counting from 0 per prefix.
    pub(crate) fn fresh_name(&mut self, prefix: &'static str) -> String {
        let counter = self.counters.entry(prefix).or_insert(0);
        let name = format!("{prefix}{counter}");
        *counter += 1;
        name
    }

    pub(crate) fn require_extension(&mut self, name: &str) {
        if !self.extensions.iter().any(|ext| ext == name) {
            self.extensions.push(name.to_owned());
        }
    }

    /// Like [`Self::require_extension`], but the pragma goes directly below the version line.
    pub(crate) fn require_extension_first(&mut self, name: &str) {
        self.extensions.retain(|ext| ext != name);
        self.extensions.insert(0, name.to_owned());
    }

    /// Declares a synthesized global once; later declarations of the same name are ignored.
    pub(crate) fn declare_global(&mut self, decl: Decl) {
        let exists = self.globals.iter().any(|global| match global {
            SynthesizedGlobal::Variable(existing) => existing.name == decl.name,
            SynthesizedGlobal::FragCoordOriginUpperLeft => false,
        });
        if !exists {
            trace!(name = %decl.name, "synthesized global");
            self.globals.push(SynthesizedGlobal::Variable(decl));
        }
    }

    pub(crate) fn declare_frag_coord_origin_upper_left(&mut self) {
        if !self
            .globals
            .contains(&SynthesizedGlobal::FragCoordOriginUpperLeft)
        {
            self.globals
                .push(SynthesizedGlobal::FragCoordOriginUpperLeft);
        }
    }

    /// Adds the helper built by `build` unless one with the same `key` exists.
    pub(crate) fn add_helper(&mut self, key: String, build: impl FnOnce() -> Function) {
        if self.helper_keys.insert(key) {
            let helper = build();
            trace!(name = %helper.name, "synthesized helper function");
            self.helpers.push(helper);
        }
    }

    /// Marks the function at `element` as having its fragment coordinate reconstructed; returns
    /// `false` if it already was.
    pub(crate) fn mark_reconstructed(&mut self, element: usize) -> bool {
        self.reconstructed.insert(element)
    }

    pub(crate) fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub(crate) fn globals(&self) -> &[SynthesizedGlobal] {
        &self.globals
    }

    pub(crate) fn helpers(&self) -> &[Function] {
        &self.helpers
    }
}
