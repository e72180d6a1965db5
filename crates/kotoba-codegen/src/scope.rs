//! Compile-time scope model.
//!
//! Identifiers resolve against a stack of [`ScopeFrame`]s mirroring the
//! runtime variable list `__varslist`:
//!
//! | Tier | Contents |
//! |---|---|
//! | 0 | the plugin namespace and the compiler's pseudo-variables |
//! | 1 | program globals: user functions, top-level assignments, `それ` |
//! | 2+ | one frame per active function body |
//!
//! Lookup runs from the innermost frame outward and the first hit wins.

use std::{
    collections::HashSet,
    ops::{Deref, DerefMut},
};

use indexmap::IndexSet;

/// Tier of the plugin namespace.
pub const PLUGIN_TIER: usize = 0;
/// Tier of program globals.
pub const GLOBAL_TIER: usize = 1;

/// Declared names of one tier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeFrame {
    names: IndexSet<String>,
    readonly: HashSet<String>,
    function: Option<String>,
}

impl ScopeFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// A frame for the body of `function`; anonymous bodies use an empty name.
    pub fn for_function(function: impl Into<String>) -> Self {
        Self {
            function: Some(function.into()),
            ..Self::default()
        }
    }

    pub fn declare(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }

    pub fn declare_readonly(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.readonly.insert(name.clone());
        self.names.insert(name);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn is_readonly(&self, name: &str) -> bool {
        self.readonly.contains(name)
    }

    /// Name of the function whose body this frame belongs to.
    pub fn function(&self) -> Option<&str> {
        self.function.as_deref()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.names.clear();
        self.readonly.clear();
    }
}

/// Where a name was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub tier: usize,
    /// Whether `tier` is the innermost frame.
    pub innermost: bool,
}

/// The frames visible at the current point of generation.
#[derive(Debug, Clone)]
pub struct ScopeStack {
    frames: Vec<ScopeFrame>,
}

impl ScopeStack {
    /// A stack holding the plugin tier and the global tier.
    pub fn new(plugins: ScopeFrame, globals: ScopeFrame) -> Self {
        Self {
            frames: vec![plugins, globals],
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn frame(&self, tier: usize) -> Option<&ScopeFrame> {
        self.frames.get(tier)
    }

    pub fn innermost(&self) -> &ScopeFrame {
        // The two permanent tiers are never popped.
        &self.frames[self.frames.len() - 1]
    }

    pub fn innermost_mut(&mut self) -> &mut ScopeFrame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    pub fn globals_mut(&mut self) -> &mut ScopeFrame {
        &mut self.frames[GLOBAL_TIER]
    }

    /// Resolve `name`, innermost frame first.
    pub fn find(&self, name: &str) -> Option<Resolved> {
        let innermost = self.frames.len() - 1;
        self.frames
            .iter()
            .enumerate()
            .rev()
            .find(|(_, frame)| frame.contains(name))
            .map(|(tier, _)| Resolved {
                tier,
                innermost: tier == innermost,
            })
    }

    /// Whether `name` is read-only in `tier`.
    pub fn is_readonly(&self, tier: usize, name: &str) -> bool {
        self.frames
            .get(tier)
            .is_some_and(|frame| frame.is_readonly(name))
    }

    /// The function whose body is being generated, if any.
    pub fn enclosing_function(&self) -> Option<&str> {
        self.frames[GLOBAL_TIER + 1..]
            .iter()
            .rev()
            .find_map(ScopeFrame::function)
    }

    fn push(&mut self, frame: ScopeFrame) {
        self.frames.push(frame);
    }

    fn pop(&mut self) -> Option<ScopeFrame> {
        if self.frames.len() > GLOBAL_TIER + 1 {
            self.frames.pop()
        } else {
            None
        }
    }
}

/// Owners of a [`ScopeStack`] that frames can be pushed onto.
pub trait Scoped {
    fn scope_mut(&mut self) -> &mut ScopeStack;

    /// Push `frame` for as long as the returned guard lives.
    fn enter(&mut self, frame: ScopeFrame) -> FrameGuard<'_, Self>
    where
        Self: Sized,
    {
        self.scope_mut().push(frame);
        FrameGuard { owner: self }
    }
}

impl Scoped for ScopeStack {
    fn scope_mut(&mut self) -> &mut ScopeStack {
        self
    }
}

/// Pops its frame when dropped, on success and error paths alike.
pub struct FrameGuard<'a, T: Scoped> {
    owner: &'a mut T,
}

impl<T: Scoped> Deref for FrameGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.owner
    }
}

impl<T: Scoped> DerefMut for FrameGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.owner
    }
}

impl<T: Scoped> Drop for FrameGuard<'_, T> {
    fn drop(&mut self) {
        self.owner.scope_mut().pop();
    }
}
