use thiserror::Error;

/// The pipeline stage a contract violation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
	StateProps,
	DispatchProps,
	Merge,
}

impl std::fmt::Display for Stage {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			Stage::StateProps => "map_state",
			Stage::DispatchProps => "map_dispatch",
			Stage::Merge => "merge",
		})
	}
}

/// Fatal setup failures. Binding construction aborts, nothing
/// recovers from these.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("no store to bind to, pass a context or set one explicitly")]
	NoStore,

	#[error("{stage} must produce a prop mapping, got {got}")]
	NotAMapping { stage: Stage, got: String },
}

/// A failure raised inside a user selector or pipeline stage.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct DeriveError {
	message: String,
}

impl DeriveError {
	pub fn new(message: impl Into<String>) -> Self {
		DeriveError {
			message: message.into(),
		}
	}

	pub fn message(&self) -> &str {
		&self.message
	}
}

impl From<ConfigError> for DeriveError {
	fn from(error: ConfigError) -> Self {
		DeriveError::new(error.to_string())
	}
}

/// What a render-phase computation returns on failure. When a
/// background failure was recorded earlier, the render failure
/// carries it along so the causal chain is visible.
#[derive(Debug, Error)]
pub enum SelectError {
	#[error("{render}")]
	Render { render: DeriveError },

	#[error(
		"{render}\nThe error may be correlated with a previously thrown error:\n{background}"
	)]
	Correlated {
		render: DeriveError,
		background: DeriveError,
	},
}

impl SelectError {
	pub fn render(&self) -> &DeriveError {
		match self {
			SelectError::Render { render } => render,
			SelectError::Correlated { render, .. } => render,
		}
	}

	pub fn background(&self) -> Option<&DeriveError> {
		match self {
			SelectError::Render { .. } => None,
			SelectError::Correlated { background, .. } => Some(background),
		}
	}
}

impl From<DeriveError> for SelectError {
	fn from(render: DeriveError) -> Self {
		SelectError::Render { render }
	}
}
