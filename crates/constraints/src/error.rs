use dvcon_kernel::GeometryError;
use thiserror::Error;

/// Everything that can go wrong while defining or evaluating constraints.
///
/// Configuration errors are raised at `add_*` time and never recovered;
/// geometric failures carry the offending point and direction.
#[derive(Debug, Error)]
pub enum ConstraintError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid constraint options: {0}")]
    Json(#[from] serde_json::Error),
    #[error(
        "A geometry parameterization must be added with set_geometry before constraints can be added"
    )]
    MissingGeometry,
    #[error("faceID must be one of iLow, iHigh, jLow, jHigh, kLow or kHigh (got {0:?})")]
    InvalidFace(String),
    #[error(
        "Cannot add leading edge constraints. One (and exactly one) of the block dimensions on \
         the specified face must be 2. The dimensions of the selected face are: ({rows}, {cols})"
    )]
    FaceShape { rows: usize, cols: usize },
    #[error("The supplied index sets are not the same length ({a} vs {b})")]
    IndexSetMismatch { a: usize, b: usize },
    #[error("LE/TE constraints need either a block and face, or two index sets")]
    MissingIndexSpec,
    #[error("Block {0} has no local index lattice")]
    UnknownBlock(usize),
    #[error("{what} must be {expected}, got {found}")]
    BoundShape {
        what: &'static str,
        expected: String,
        found: String,
    },
    #[error("A constraint named {0:?} already exists")]
    DuplicateName(String),
    #[error("No point set named {0:?} is registered")]
    UnknownPointSet(String),
    #[error("No local shape-variable group named {0:?}")]
    UnknownDesignGroup(String),
    #[error(
        "Local shape-variable group {name:?} lists {coefs} coefficients but holds {values} values"
    )]
    GroupShape {
        name: String,
        coefs: usize,
        values: usize,
    },
    #[error("Volume constraint {0:?} has zero reference volume and cannot be scaled")]
    ZeroVolume(String),
    #[error("Control point {0} does not exist")]
    UnknownCoefficient(usize),
    #[error("Sensitivity for {name:?} has {found} columns, expected {expected}")]
    SensitivityShape {
        name: String,
        expected: usize,
        found: usize,
    },
}
