//! Field-valued collaborators and the point/field connection
//!
//! A field is a `Sample` with one row per mesh vertex. `ModalLifting` and
//! `ModalProjection` are the two modal maps between coefficient points and
//! fields; `PointToFieldConnection` chains a point-valued end with a
//! field-valued end so that the result can be used as an ordinary
//! [`Function`].

use crate::error::{FunctionError, Result, check_dimension};
use crate::evaluation::{Evaluation, EvaluationState, check_input, check_sample, map_rows};
use crate::function::{Function, FunctionKind};
use crate::instrument::CallCounter;
use crate::linalg::{Description, Matrix, Point, Sample};
use crate::persistence::Advocate;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub type PointToFieldRef = Arc<dyn PointToFieldFunction>;
pub type FieldToPointRef = Arc<dyn FieldToPointFunction>;

/// Vertices a field is discretised on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    vertices: Sample,
}

impl Mesh {
    pub fn new(vertices: Sample) -> Self {
        Mesh { vertices }
    }

    /// Regular grid of `n` vertices over `[a, b]`
    pub fn regular(a: f64, b: f64, n: usize) -> Self {
        let step = if n > 1 { (b - a) / (n - 1) as f64 } else { 0.0 };
        let data = (0..n).map(|i| a + step * i as f64).collect();
        Mesh::new(Sample::from_rows(1, data))
    }

    pub fn vertices(&self) -> &Sample {
        &self.vertices
    }

    pub fn vertices_number(&self) -> usize {
        self.vertices.size()
    }

    pub fn dimension(&self) -> usize {
        self.vertices.dimension()
    }
}

/// Maps a point to a field over `output_mesh`
pub trait PointToFieldFunction: Send + Sync + fmt::Debug {
    fn class_name(&self) -> &'static str;
    fn input_dimension(&self) -> usize;
    /// Dimension of the field values at each vertex
    fn output_dimension(&self) -> usize;
    fn output_mesh(&self) -> &Mesh;
    fn input_description(&self) -> Description;
    fn output_description(&self) -> Description;
    fn evaluate(&self, x: &Point) -> Result<Sample>;
    fn calls_number(&self) -> u64;

    fn save(&self, _adv: &mut Advocate<'_>) -> Result<()> {
        Err(FunctionError::persistence(format!(
            "{} cannot be saved",
            self.class_name()
        )))
    }
}

/// Maps a field over `input_mesh` to a point
pub trait FieldToPointFunction: Send + Sync + fmt::Debug {
    fn class_name(&self) -> &'static str;
    /// Dimension of the field values at each vertex
    fn input_dimension(&self) -> usize;
    fn output_dimension(&self) -> usize;
    fn input_mesh(&self) -> &Mesh;
    fn input_description(&self) -> Description;
    fn output_description(&self) -> Description;
    fn evaluate(&self, field: &Sample) -> Result<Point>;
    fn calls_number(&self) -> u64;

    fn save(&self, _adv: &mut Advocate<'_>) -> Result<()> {
        Err(FunctionError::persistence(format!(
            "{} cannot be saved",
            self.class_name()
        )))
    }
}

fn check_modes(mesh: &Mesh, modes: &[Sample]) -> Result<usize> {
    let first = modes
        .first()
        .ok_or_else(|| FunctionError::configuration("at least one mode is required"))?;
    for mode in modes {
        check_dimension("mode vertices", mesh.vertices_number(), mode.size())?;
        check_dimension("mode dimension", first.dimension(), mode.dimension())?;
    }
    Ok(first.dimension())
}

// ===== ModalLifting =====

/// `ξ ↦ Σₖ ξₖ φₖ`
#[derive(Debug)]
pub struct ModalLifting {
    mesh: Mesh,
    modes: Vec<Sample>,
    field_dimension: usize,
    calls: CallCounter,
}

impl ModalLifting {
    pub fn new(mesh: Mesh, modes: Vec<Sample>) -> Result<Self> {
        let field_dimension = check_modes(&mesh, &modes)?;
        Ok(ModalLifting {
            mesh,
            modes,
            field_dimension,
            calls: CallCounter::new(),
        })
    }

    pub fn modes(&self) -> &[Sample] {
        &self.modes
    }

    pub(crate) fn load(adv: &mut Advocate<'_>) -> Result<Self> {
        Self::new(adv.load_attribute("mesh")?, adv.load_attribute("modes")?)
    }
}

impl PointToFieldFunction for ModalLifting {
    fn class_name(&self) -> &'static str {
        "ModalLifting"
    }

    fn input_dimension(&self) -> usize {
        self.modes.len()
    }

    fn output_dimension(&self) -> usize {
        self.field_dimension
    }

    fn output_mesh(&self) -> &Mesh {
        &self.mesh
    }

    fn input_description(&self) -> Description {
        Description::build_default(self.modes.len(), "xi")
    }

    fn output_description(&self) -> Description {
        Description::build_default(self.field_dimension, "v")
    }

    fn evaluate(&self, x: &Point) -> Result<Sample> {
        check_dimension("lifting coefficients", self.modes.len(), x.dimension())?;
        let mut field = Sample::zeros(self.mesh.vertices_number(), self.field_dimension);
        for (xi, mode) in x.iter().zip(&self.modes) {
            for (value, m) in field.as_mut_slice().iter_mut().zip(mode.as_slice()) {
                *value += xi * m;
            }
        }
        field.set_description(self.output_description());
        self.calls.increment();
        Ok(field)
    }

    fn calls_number(&self) -> u64 {
        self.calls.get()
    }

    fn save(&self, adv: &mut Advocate<'_>) -> Result<()> {
        adv.save_attribute("mesh", &self.mesh)?;
        adv.save_attribute("modes", &self.modes)
    }
}

// ===== ModalProjection =====

/// `field ↦ ξ` with `ξₖ = Σᵥ wᵥ ⟨φₖ(v), field(v)⟩`
#[derive(Debug)]
pub struct ModalProjection {
    mesh: Mesh,
    modes: Vec<Sample>,
    weights: Point,
    field_dimension: usize,
    calls: CallCounter,
}

impl ModalProjection {
    pub fn new(mesh: Mesh, modes: Vec<Sample>, weights: Point) -> Result<Self> {
        let field_dimension = check_modes(&mesh, &modes)?;
        check_dimension("projection weights", mesh.vertices_number(), weights.dimension())?;
        Ok(ModalProjection {
            mesh,
            modes,
            weights,
            field_dimension,
            calls: CallCounter::new(),
        })
    }

    /// Projection with unit weights on every vertex
    pub fn with_unit_weights(mesh: Mesh, modes: Vec<Sample>) -> Result<Self> {
        let weights = Point::new(mesh.vertices_number(), 1.0);
        Self::new(mesh, modes, weights)
    }

    pub fn weights(&self) -> &Point {
        &self.weights
    }

    pub(crate) fn load(adv: &mut Advocate<'_>) -> Result<Self> {
        Self::new(
            adv.load_attribute("mesh")?,
            adv.load_attribute("modes")?,
            adv.load_attribute("weights")?,
        )
    }
}

impl FieldToPointFunction for ModalProjection {
    fn class_name(&self) -> &'static str {
        "ModalProjection"
    }

    fn input_dimension(&self) -> usize {
        self.field_dimension
    }

    fn output_dimension(&self) -> usize {
        self.modes.len()
    }

    fn input_mesh(&self) -> &Mesh {
        &self.mesh
    }

    fn input_description(&self) -> Description {
        Description::build_default(self.field_dimension, "v")
    }

    fn output_description(&self) -> Description {
        Description::build_default(self.modes.len(), "xi")
    }

    fn evaluate(&self, field: &Sample) -> Result<Point> {
        check_dimension("projected field vertices", self.mesh.vertices_number(), field.size())?;
        check_dimension("projected field dimension", self.field_dimension, field.dimension())?;
        let xi = self
            .modes
            .iter()
            .map(|mode| {
                (0..field.size())
                    .map(|v| {
                        let dot: f64 = mode.row(v).iter().zip(field.row(v)).map(|(a, b)| a * b).sum();
                        self.weights[v] * dot
                    })
                    .sum::<f64>()
            })
            .collect();
        self.calls.increment();
        Ok(xi)
    }

    fn calls_number(&self) -> u64 {
        self.calls.get()
    }

    fn save(&self, adv: &mut Advocate<'_>) -> Result<()> {
        adv.save_attribute("mesh", &self.mesh)?;
        adv.save_attribute("modes", &self.modes)?;
        adv.save_attribute("weights", &self.weights)
    }
}

// ===== PointToFieldConnection =====

#[derive(Debug)]
enum Connection {
    /// point ↦ point ↦ field
    PointThenField {
        function: Function,
        field_function: PointToFieldRef,
    },
    /// point ↦ field ↦ point
    FieldThenPoint {
        field_function: PointToFieldRef,
        projection: FieldToPointRef,
    },
}

/// Chains a point-valued end with a field-valued end.
///
/// In the point-then-field shape the produced field is flattened vertex by
/// vertex into the output point; `evaluate_field` returns it unflattened.
#[derive(Debug)]
pub struct PointToFieldConnection {
    connection: Connection,
    output_dimension: usize,
    state: EvaluationState,
}

impl PointToFieldConnection {
    /// `x ↦ field_function(function(x))`
    pub fn new(field_function: PointToFieldRef, function: Function) -> Result<Self> {
        check_dimension(
            "point to field connection boundary",
            field_function.input_dimension(),
            function.output_dimension(),
        )?;
        let vertices = field_function.output_mesh().vertices_number();
        let output_dimension = vertices * field_function.output_dimension();
        let field_names = field_function.output_description();
        let mut description = function.input_description();
        for v in 0..vertices {
            for name in field_names.iter() {
                description.push(format!("{}_{}", name, v));
            }
        }
        debug!(
            "point to field connection R^{} -> {} vertices x R^{}",
            function.input_dimension(),
            vertices,
            field_function.output_dimension()
        );
        let state = EvaluationState::new(function.input_dimension(), output_dimension, description);
        Ok(PointToFieldConnection {
            connection: Connection::PointThenField {
                function,
                field_function,
            },
            output_dimension,
            state,
        })
    }

    /// `x ↦ projection(field_function(x))`
    pub fn through_field(projection: FieldToPointRef, field_function: PointToFieldRef) -> Result<Self> {
        check_dimension(
            "field connection boundary",
            projection.input_dimension(),
            field_function.output_dimension(),
        )?;
        check_dimension(
            "field connection vertices",
            projection.input_mesh().vertices_number(),
            field_function.output_mesh().vertices_number(),
        )?;
        debug!(
            "field connection R^{} -> R^{} through {} vertices",
            field_function.input_dimension(),
            projection.output_dimension(),
            field_function.output_mesh().vertices_number()
        );
        let description = field_function
            .input_description()
            .concat(&projection.output_description());
        let output_dimension = projection.output_dimension();
        let state = EvaluationState::new(field_function.input_dimension(), output_dimension, description);
        Ok(PointToFieldConnection {
            connection: Connection::FieldThenPoint {
                field_function,
                projection,
            },
            output_dimension,
            state,
        })
    }

    /// Wrap as a [`Function`] with finite-difference derivatives
    pub fn into_function(self: Arc<Self>) -> Function {
        Function::with_finite_differences(self, FunctionKind::PointToFieldConnection)
    }

    /// The intermediate field for `x`
    pub fn evaluate_field(&self, x: &Point) -> Result<Sample> {
        check_input(self.input_dimension(), x)?;
        match &self.connection {
            Connection::PointThenField {
                function,
                field_function,
            } => field_function.evaluate(&function.evaluate(x)?),
            Connection::FieldThenPoint { field_function, .. } => field_function.evaluate(x),
        }
    }

    fn compute(&self, x: &Point) -> Result<Point> {
        let field = self.evaluate_field(x)?;
        match &self.connection {
            Connection::PointThenField { .. } => Ok(Point::from(field.as_slice())),
            Connection::FieldThenPoint { projection, .. } => projection.evaluate(&field),
        }
    }

    pub(crate) fn load(adv: &mut Advocate<'_>) -> Result<Self> {
        let shape: String = adv.load_attribute("shape")?;
        match shape.as_str() {
            "point_then_field" => Self::new(
                adv.load_point_to_field("field_function")?,
                adv.load_function("function")?,
            ),
            "field_then_point" => Self::through_field(
                adv.load_field_to_point("projection")?,
                adv.load_point_to_field("field_function")?,
            ),
            other => Err(FunctionError::persistence(format!(
                "unknown connection shape {}",
                other
            ))),
        }
    }
}

impl Evaluation for PointToFieldConnection {
    fn class_name(&self) -> &'static str {
        "PointToFieldConnection"
    }

    fn input_dimension(&self) -> usize {
        match &self.connection {
            Connection::PointThenField { function, .. } => function.input_dimension(),
            Connection::FieldThenPoint { field_function, .. } => field_function.input_dimension(),
        }
    }

    fn output_dimension(&self) -> usize {
        self.output_dimension
    }

    fn evaluate(&self, x: &Point) -> Result<Point> {
        let y = self.compute(x)?;
        self.state.instrumentation().record(x, &y);
        Ok(y)
    }

    fn evaluate_sample(&self, xs: &Sample) -> Result<Sample> {
        check_sample(self.input_dimension(), xs)?;
        let mut ys = map_rows(xs, self.output_dimension, |x| self.compute(&Point::from(x)))?;
        self.state.instrumentation().record_sample(xs, &ys);
        ys.set_description(self.output_description());
        Ok(ys)
    }

    fn state(&self) -> &EvaluationState {
        &self.state
    }

    fn parameter(&self) -> Point {
        match &self.connection {
            Connection::PointThenField { function, .. } => function.parameter(),
            Connection::FieldThenPoint { .. } => Point::default(),
        }
    }

    fn set_parameter(&self, parameter: &Point) -> Result<()> {
        match &self.connection {
            Connection::PointThenField { function, .. } => function.set_parameter(parameter),
            Connection::FieldThenPoint { .. } => {
                check_dimension("parameter", 0, parameter.dimension())
            }
        }
    }

    fn parameter_description(&self) -> Description {
        match &self.connection {
            Connection::PointThenField { function, .. } => function.parameter_description(),
            Connection::FieldThenPoint { .. } => Description::default(),
        }
    }

    fn parameter_gradient(&self, x: &Point) -> Result<Matrix> {
        check_input(self.input_dimension(), x)?;
        let p = self.parameter().dimension();
        if p == 0 {
            return Ok(Matrix::zeros(0, self.output_dimension));
        }
        Err(FunctionError::NotDifferentiable(
            "parameter gradient through a field function".to_string(),
        ))
    }

    fn save(&self, adv: &mut Advocate<'_>) -> Result<()> {
        match &self.connection {
            Connection::PointThenField {
                function,
                field_function,
            } => {
                adv.save_attribute("shape", "point_then_field")?;
                adv.save_function("function", function)?;
                adv.save_point_to_field("field_function", field_function)
            }
            Connection::FieldThenPoint {
                field_function,
                projection,
            } => {
                adv.save_attribute("shape", "field_then_point")?;
                adv.save_point_to_field("field_function", field_function)?;
                adv.save_field_to_point("projection", projection)
            }
        }
    }
}

impl fmt::Display for PointToFieldConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.connection {
            Connection::PointThenField {
                function,
                field_function,
            } => write!(f, "{}o({})", field_function.class_name(), function),
            Connection::FieldThenPoint {
                field_function,
                projection,
            } => write!(f, "{}o{}", projection.class_name(), field_function.class_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modes() -> (Mesh, Vec<Sample>) {
        let mesh = Mesh::regular(0.0, 1.0, 3);
        let modes = vec![
            Sample::from_rows(1, vec![1.0, 0.0, 0.0]),
            Sample::from_rows(1, vec![0.0, 1.0, 1.0]),
        ];
        (mesh, modes)
    }

    #[test]
    fn test_lifting_then_projection() {
        let (mesh, modes) = modes();
        let lifting: PointToFieldRef = Arc::new(ModalLifting::new(mesh.clone(), modes.clone()).unwrap());
        let projection: FieldToPointRef =
            Arc::new(ModalProjection::with_unit_weights(mesh, modes).unwrap());
        let connection = PointToFieldConnection::through_field(projection, lifting).unwrap();

        let y = connection.evaluate(&Point::from([2.0, 3.0])).unwrap();
        // second mode has squared norm 2
        assert_eq!(y, Point::from([2.0, 6.0]));
        assert_eq!(connection.calls_number(), 1);
    }

    #[test]
    fn test_lifting_rejects_bad_modes() {
        let mesh = Mesh::regular(0.0, 1.0, 3);
        assert!(matches!(
            ModalLifting::new(mesh.clone(), vec![]),
            Err(FunctionError::InvalidConfiguration(_))
        ));
        let short = vec![Sample::from_rows(1, vec![1.0, 0.0])];
        assert!(matches!(
            ModalLifting::new(mesh, short),
            Err(FunctionError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_mismatched_vertices() {
        let (mesh, modes) = modes();
        let lifting: PointToFieldRef = Arc::new(ModalLifting::new(mesh, modes).unwrap());
        let other = Mesh::regular(0.0, 1.0, 2);
        let projection: FieldToPointRef = Arc::new(
            ModalProjection::with_unit_weights(other, vec![Sample::from_rows(1, vec![1.0, 1.0])])
                .unwrap(),
        );
        assert!(matches!(
            PointToFieldConnection::through_field(projection, lifting),
            Err(FunctionError::DimensionMismatch { .. })
        ));
    }
}
