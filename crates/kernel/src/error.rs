use thiserror::Error;

/// Failures raised by the geometric kernels.
///
/// None of these are recovered internally: a failed projection means the
/// sampled region does not lie over the discretized surface.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error(
        "There was an error projecting a node at ({:.6}, {:.6}, {:.6}) with normal ({:.6}, {:.6}, {:.6})",
        point[0], point[1], point[2], direction[0], direction[1], direction[2]
    )]
    ProjectionFailed {
        point: [f64; 3],
        direction: [f64; 3],
    },
    #[error("A polyline needs at least two distinct points (got {count})")]
    DegeneratePolyline { count: usize },
    #[error(
        "Direction ({:.6}, {:.6}, {:.6}) has zero length",
        direction[0], direction[1], direction[2]
    )]
    ZeroDirection { direction: [f64; 3] },
    #[error("Invalid sampling grid: {n_span} x {n_chord}")]
    InvalidGrid { n_span: usize, n_chord: usize },
    #[error("Invalid surface definition: {0}")]
    InvalidSurface(String),
    #[error("Expected {expected} coordinates, found {found}")]
    CoordinateCount { expected: usize, found: usize },
}
