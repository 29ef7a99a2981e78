use crate::error::{DeriveError, SelectError};

/// One slot per binding instance for the last failure raised outside
/// of a render pass. A background failure cannot reach anyone
/// synchronously, so it waits here until the next render-phase
/// computation either succeeds (the slot is dropped) or fails too
/// (the slot is attached to the render failure).
#[derive(Default)]
pub struct ErrorBuffer {
	slot: Option<DeriveError>,
}

impl ErrorBuffer {
	pub fn new() -> Self {
		ErrorBuffer { slot: None }
	}

	pub fn record(&mut self, error: DeriveError) {
		tracing::error!("background derive failed: {}", error);
		self.slot = Some(error);
	}

	pub fn clear(&mut self) {
		self.slot = None;
	}

	pub fn pending(&self) -> Option<&DeriveError> {
		self.slot.as_ref()
	}

	/// Builds the render-phase error. The slot stays set until a
	/// render pass succeeds, so repeated failures keep pointing at
	/// the background failure that likely caused them.
	pub fn correlate(&self, render: DeriveError) -> SelectError {
		match &self.slot {
			Some(background) => SelectError::Correlated {
				render,
				background: background.clone(),
			},
			None => SelectError::Render { render },
		}
	}
}
