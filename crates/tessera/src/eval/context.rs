//! Evaluation context frames.
//!
//! Every nested reference resolution runs in a child [`Frame`]. Frames live
//! in a [`ContextStack`] arena and point at their parent by index, so the
//! logical resolution chain can be walked for cycle detection without any
//! ownership cycle between frames.

use log::debug;
use thiserror::Error;
use uuid::Uuid;

/// The entity a frame evaluates: a data set, optionally narrowed to one of
/// its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subject {
    dataset: Uuid,
    attribute: Option<Uuid>,
}

impl Subject {
    /// Free text evaluated on behalf of a data set
    pub fn dataset(dataset: Uuid) -> Self {
        Self {
            dataset,
            attribute: None,
        }
    }

    /// The stored value of one attribute of a data set
    pub fn parameter(dataset: Uuid, attribute: Uuid) -> Self {
        Self {
            dataset,
            attribute: Some(attribute),
        }
    }

    pub fn dataset_id(&self) -> Uuid {
        self.dataset
    }

    pub fn attribute_id(&self) -> Option<Uuid> {
        self.attribute
    }
}

/// Index of a frame inside its [`ContextStack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    subject: Option<Subject>,
    parent: Option<FrameId>,
    description: String,
    /// Reference attributes and lists traversed to reach the subject
    path: Vec<Uuid>,
}

impl Frame {
    pub fn subject(&self) -> Option<Subject> {
        self.subject
    }

    pub fn parent(&self) -> Option<FrameId> {
        self.parent
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn path(&self) -> &[Uuid] {
        &self.path
    }
}

/// Fatal evaluation context errors. Any of them aborts the whole pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("reference cycle detected: {trail}")]
    Cycle { trail: String },

    #[error("evaluation nested deeper than {max_depth} levels: {trail}")]
    DepthExceeded { max_depth: usize, trail: String },

    #[error("`{macro_name}` needs a current data set, but the text is evaluated without one")]
    MissingContext { macro_name: String },
}

/// Separator between frame descriptions in a resolution trail
pub const TRAIL_SEPARATOR: &str = " -> ";

/// Arena of evaluation frames for one pass.
///
/// Frames form a strict call tree: the frame pushed last is always popped
/// first.
#[derive(Debug, Clone)]
pub struct ContextStack {
    frames: Vec<Frame>,
    max_depth: usize,
}

impl ContextStack {
    /// Start a pass at `subject` with a single root frame.
    pub fn new(subject: Option<Subject>, description: impl Into<String>, max_depth: usize) -> Self {
        Self {
            frames: vec![Frame {
                subject,
                parent: None,
                description: description.into(),
                path: Vec::new(),
            }],
            max_depth,
        }
    }

    pub fn root(&self) -> &Frame {
        &self.frames[0]
    }

    /// The innermost frame
    pub fn current(&self) -> &Frame {
        self.frames.last().unwrap_or_else(|| self.root())
    }

    pub fn current_id(&self) -> FrameId {
        FrameId(self.frames.len().saturating_sub(1))
    }

    pub fn get(&self, id: FrameId) -> Option<&Frame> {
        self.frames.get(id.0)
    }

    /// Number of frames from the root to the current frame, inclusive
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Frames from the current one up to the root, following parent links.
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors {
            stack: self,
            next: Some(self.current_id()),
        }
    }

    /// Push a child of the current frame.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::Cycle`] if `subject` is already being
    /// evaluated by an ancestor frame, and [`ContextError::DepthExceeded`]
    /// if the stack is full.
    pub fn enter(
        &mut self,
        subject: Subject,
        description: impl Into<String>,
        path: Vec<Uuid>,
    ) -> Result<FrameId, ContextError> {
        let description = description.into();

        if self.ancestors().any(|frame| frame.subject == Some(subject)) {
            return Err(ContextError::Cycle {
                trail: self.trail_to(&description),
            });
        }
        if self.depth() >= self.max_depth {
            return Err(ContextError::DepthExceeded {
                max_depth: self.max_depth,
                trail: self.trail_to(&description),
            });
        }

        let parent = self.current_id();
        self.frames.push(Frame {
            subject: Some(subject),
            parent: Some(parent),
            description,
            path,
        });
        let id = self.current_id();
        debug!(frame = id.0, parent = parent.0, depth = self.depth(); "Entered frame");
        Ok(id)
    }

    /// Pop `id` and everything above it. The root frame is never popped.
    pub fn leave(&mut self, id: FrameId) {
        if id.0 > 0 && id.0 < self.frames.len() {
            self.frames.truncate(id.0);
            debug!(frame = id.0, depth = self.depth(); "Left frame");
        }
    }

    /// Descriptions from the root to the current frame, joined.
    pub fn trail(&self) -> String {
        let mut descriptions: Vec<&str> = self.ancestors().map(Frame::description).collect();
        descriptions.reverse();
        descriptions.join(TRAIL_SEPARATOR)
    }

    fn trail_to(&self, description: &str) -> String {
        format!("{}{TRAIL_SEPARATOR}{description}", self.trail())
    }
}

/// Iterator over a frame and its ancestors.
pub struct Ancestors<'a> {
    stack: &'a ContextStack,
    next: Option<FrameId>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Frame;

    fn next(&mut self) -> Option<Self::Item> {
        let frame = self.stack.get(self.next?)?;
        self.next = frame.parent;
        Some(frame)
    }
}
