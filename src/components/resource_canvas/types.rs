use crate::model::ResourceId;

/// What a finished pointer gesture did, reported to the owning page.
#[derive(Clone, Debug, PartialEq)]
pub enum CanvasEvent {
	/// A node was clicked outside connect mode.
	Selected { id: ResourceId, ring: u8 },
	/// Click on empty canvas dropped the selection.
	Cleared,
	/// First click of the connect workflow.
	ConnectStarted(ResourceId),
	/// The connect source was clicked again.
	ConnectCancelled,
	/// Second click of the connect workflow on a different node.
	ConnectRequested { source: ResourceId, target: ResourceId },
	/// A node was dragged to a new top-left position.
	Moved { id: ResourceId, x: f64, y: f64 },
}

/// Toolbar actions a page sends to the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewCommand {
	ZoomIn,
	ZoomOut,
	/// Forget dragged positions and restore the initial pan/zoom.
	Reset,
	/// Save the current frame as a PNG.
	Download,
}
