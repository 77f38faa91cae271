//! Saving and reloading function graphs
//!
//! A [`Study`] stores every node as an attribute map under an integer id.
//! Children are referenced by id, so a node shared by several parents is
//! stored once and comes back as one shared node.
//!
//! # Example
//! ```
//! use function_algebra::{Function, LinearFunction, Matrix, Point, Study};
//!
//! let f = Function::from_primitive(LinearFunction::new(
//!     Point::zeros(1), Point::from([1.0]), Matrix::identity(1))?);
//! let mut study = Study::new();
//! study.add("f", &f)?;
//! let json = study.to_json()?;
//!
//! let mut reloaded = Study::from_json(&json)?;
//! let g = reloaded.function("f")?;
//! assert_eq!(g.evaluate(&Point::from([2.0]))?, Point::from([3.0]));
//! # Ok::<(), function_algebra::FunctionError>(())
//! ```

use crate::error::{FunctionError, Result};
use crate::field::{
    FieldToPointRef, ModalLifting, ModalProjection, PointToFieldConnection, PointToFieldRef,
};
use crate::function::Function;
use crate::linalg::{Description, Point};
use crate::primitives::{LinearFunction, QuadraticFunction};
use log::trace;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

type Attributes = Map<String, Value>;

/// A live node known to the study, kept alive so that its address stays
/// unique while the study exists
#[derive(Debug, Clone)]
enum Node {
    Function(Function),
    PointToField(PointToFieldRef),
    FieldToPoint(FieldToPointRef),
}

impl Node {
    fn address(&self) -> usize {
        match self {
            Node::Function(f) => Arc::as_ptr(f.evaluation()) as *const () as usize,
            Node::PointToField(f) => Arc::as_ptr(f) as *const () as usize,
            Node::FieldToPoint(f) => Arc::as_ptr(f) as *const () as usize,
        }
    }
}

/// Attribute store for a set of named function graphs
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Study {
    objects: BTreeMap<usize, Attributes>,
    roots: BTreeMap<String, usize>,
    #[serde(default)]
    next_id: usize,
    #[serde(skip)]
    saved: FxHashMap<usize, (usize, Node)>,
    #[serde(skip)]
    loaded: FxHashMap<usize, Node>,
    /// Ids whose load is in progress
    #[serde(skip)]
    loading: FxHashSet<usize>,
}

impl Study {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `function` and everything it references under `name`.
    ///
    /// On failure the study is left as it was before the call.
    pub fn add(&mut self, name: impl Into<String>, function: &Function) -> Result<()> {
        let first_id = self.next_id;
        match self.save_node(Node::Function(function.clone())) {
            Ok(id) => {
                self.roots.insert(name.into(), id);
                Ok(())
            }
            Err(e) => {
                // ids are handed out in increasing order
                self.objects.retain(|id, _| *id < first_id);
                self.saved.retain(|_, (id, _)| *id < first_id);
                self.next_id = first_id;
                Err(e)
            }
        }
    }

    /// Rebuild the function stored under `name`.
    ///
    /// Nodes reloaded earlier from this study are reused.
    pub fn function(&mut self, name: &str) -> Result<Function> {
        let id = *self
            .roots
            .get(name)
            .ok_or_else(|| FunctionError::persistence(format!("no object named {}", name)))?;
        self.load_function(id)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.roots.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.roots.contains_key(name)
    }

    /// Number of stored objects, shared ones counted once
    pub fn objects_number(&self) -> usize {
        self.objects.len()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Study> {
        let mut study: Study = serde_json::from_str(json)?;
        if let Some(last) = study.objects.keys().next_back() {
            study.next_id = study.next_id.max(last + 1);
        }
        Ok(study)
    }

    fn save_node(&mut self, node: Node) -> Result<usize> {
        let address = node.address();
        if let Some((id, _)) = self.saved.get(&address) {
            return Ok(*id);
        }
        let id = self.next_id;
        self.next_id += 1;
        self.saved.insert(address, (id, node.clone()));

        let mut adv = Advocate {
            study: self,
            attributes: Attributes::new(),
        };
        adv.save_node(&node)?;
        let attributes = adv.attributes;
        trace!(
            "saved object {} of class {}",
            id,
            attributes.get("class").and_then(Value::as_str).unwrap_or_default()
        );
        self.objects.insert(id, attributes);
        Ok(id)
    }

    /// Mark `id` as being loaded; re-entering it means the stored graph has a cycle
    fn enter(&mut self, id: usize) -> Result<()> {
        if self.loading.insert(id) {
            Ok(())
        } else {
            Err(FunctionError::persistence(format!(
                "cyclic reference to object {}",
                id
            )))
        }
    }

    fn advocate(&mut self, id: usize) -> Result<(String, Advocate<'_>)> {
        let attributes = self
            .objects
            .get(&id)
            .cloned()
            .ok_or_else(|| FunctionError::persistence(format!("no object with id {}", id)))?;
        let adv = Advocate {
            study: self,
            attributes,
        };
        let class: String = adv.load_attribute("class")?;
        trace!("loading object {} of class {}", id, class);
        Ok((class, adv))
    }

    fn load_function(&mut self, id: usize) -> Result<Function> {
        match self.loaded.get(&id) {
            Some(Node::Function(f)) => return Ok(f.clone()),
            Some(_) => return Err(FunctionError::persistence(format!("object {} is not a function", id))),
            None => {}
        }
        self.enter(id)?;
        let function = self.build_function(id);
        self.loading.remove(&id);
        let function = function?;
        self.loaded.insert(id, Node::Function(function.clone()));
        Ok(function)
    }

    fn build_function(&mut self, id: usize) -> Result<Function> {
        let (class, mut adv) = self.advocate(id)?;
        let function = match class.as_str() {
            "LinearFunction" => Function::from_primitive(LinearFunction::load(&mut adv)?),
            "QuadraticFunction" => Function::from_primitive(QuadraticFunction::load(&mut adv)?),
            "ProductEvaluation" => {
                Function::product(&adv.load_function("left")?, &adv.load_function("right")?)?
            }
            "LinearCombinationEvaluation" => Function::linear_combination(
                adv.load_functions("functions")?,
                adv.load_attribute("coefficients")?,
            )?,
            "CompositionEvaluation" => {
                Function::compose(&adv.load_function("outer")?, &adv.load_function("inner")?)?
            }
            "MarginalEvaluation" => {
                let indices: Vec<usize> = adv.load_attribute("indices")?;
                adv.load_function("function")?.marginal_wrapper(&indices)?
            }
            "PointToFieldConnection" => Arc::new(PointToFieldConnection::load(&mut adv)?).into_function(),
            other => {
                return Err(FunctionError::persistence(format!(
                    "unknown function class {}",
                    other
                )));
            }
        };
        let description: Description = adv.load_attribute("description")?;
        let parameter: Point = adv.load_attribute("parameter")?;
        function.set_description(description)?;
        function.set_parameter(&parameter)?;
        Ok(function)
    }

    fn load_point_to_field(&mut self, id: usize) -> Result<PointToFieldRef> {
        if let Some(Node::PointToField(f)) = self.loaded.get(&id) {
            return Ok(f.clone());
        }
        self.enter(id)?;
        let function = self.advocate(id).and_then(|(class, mut adv)| match class.as_str() {
            "ModalLifting" => Ok(Arc::new(ModalLifting::load(&mut adv)?) as PointToFieldRef),
            other => Err(FunctionError::persistence(format!(
                "unknown point to field class {}",
                other
            ))),
        });
        self.loading.remove(&id);
        let function = function?;
        self.loaded.insert(id, Node::PointToField(function.clone()));
        Ok(function)
    }

    fn load_field_to_point(&mut self, id: usize) -> Result<FieldToPointRef> {
        if let Some(Node::FieldToPoint(f)) = self.loaded.get(&id) {
            return Ok(f.clone());
        }
        self.enter(id)?;
        let function = self.advocate(id).and_then(|(class, mut adv)| match class.as_str() {
            "ModalProjection" => Ok(Arc::new(ModalProjection::load(&mut adv)?) as FieldToPointRef),
            other => Err(FunctionError::persistence(format!(
                "unknown field to point class {}",
                other
            ))),
        });
        self.loading.remove(&id);
        let function = function?;
        self.loaded.insert(id, Node::FieldToPoint(function.clone()));
        Ok(function)
    }
}

/// Reads and writes the attributes of one stored object
pub struct Advocate<'a> {
    study: &'a mut Study,
    attributes: Attributes,
}

impl Advocate<'_> {
    fn save_node(&mut self, node: &Node) -> Result<()> {
        match node {
            Node::Function(f) => {
                self.save_attribute("class", f.evaluation().class_name())?;
                self.save_attribute("description", &f.description())?;
                self.save_attribute("parameter", &f.parameter())?;
                f.evaluation().save(self)
            }
            Node::PointToField(f) => {
                self.save_attribute("class", f.class_name())?;
                f.save(self)
            }
            Node::FieldToPoint(f) => {
                self.save_attribute("class", f.class_name())?;
                f.save(self)
            }
        }
    }

    pub fn save_attribute<T: Serialize + ?Sized>(&mut self, name: &str, value: &T) -> Result<()> {
        self.attributes.insert(name.to_string(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn load_attribute<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let value = self
            .attributes
            .get(name)
            .ok_or_else(|| FunctionError::persistence(format!("missing attribute {}", name)))?;
        T::deserialize(value)
            .map_err(|e| FunctionError::persistence(format!("invalid attribute {}: {}", name, e)))
    }

    /// Store `function` as a child and reference it by id
    pub fn save_function(&mut self, name: &str, function: &Function) -> Result<()> {
        let id = self.study.save_node(Node::Function(function.clone()))?;
        self.save_attribute(name, &id)
    }

    pub fn load_function(&mut self, name: &str) -> Result<Function> {
        let id: usize = self.load_attribute(name)?;
        self.study.load_function(id)
    }

    pub fn save_functions(&mut self, name: &str, functions: &[Function]) -> Result<()> {
        let ids = functions
            .iter()
            .map(|f| self.study.save_node(Node::Function(f.clone())))
            .collect::<Result<Vec<_>>>()?;
        self.save_attribute(name, &ids)
    }

    pub fn load_functions(&mut self, name: &str) -> Result<Vec<Function>> {
        let ids: Vec<usize> = self.load_attribute(name)?;
        ids.into_iter().map(|id| self.study.load_function(id)).collect()
    }

    pub fn save_point_to_field(&mut self, name: &str, function: &PointToFieldRef) -> Result<()> {
        let id = self.study.save_node(Node::PointToField(function.clone()))?;
        self.save_attribute(name, &id)
    }

    pub fn load_point_to_field(&mut self, name: &str) -> Result<PointToFieldRef> {
        let id: usize = self.load_attribute(name)?;
        self.study.load_point_to_field(id)
    }

    pub fn save_field_to_point(&mut self, name: &str, function: &FieldToPointRef) -> Result<()> {
        let id = self.study.save_node(Node::FieldToPoint(function.clone()))?;
        self.save_attribute(name, &id)
    }

    pub fn load_field_to_point(&mut self, name: &str) -> Result<FieldToPointRef> {
        let id: usize = self.load_attribute(name)?;
        self.study.load_field_to_point(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::Matrix;

    fn affine(slope: f64, constant: f64) -> Function {
        Function::from_primitive(
            LinearFunction::new(
                Point::zeros(1),
                Point::from([constant]),
                Matrix::from_rows(&[vec![slope]]),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_missing_name() {
        let mut study = Study::new();
        assert!(matches!(
            study.function("nothing"),
            Err(FunctionError::Persistence(_))
        ));
    }

    #[test]
    fn test_shared_child_stored_once() {
        let f = affine(2.0, 1.0);
        let g = Function::product(&f, &f).unwrap();
        let mut study = Study::new();
        study.add("g", &g).unwrap();
        study.add("f", &f).unwrap();
        assert_eq!(study.objects_number(), 2);

        let mut reloaded = Study::from_json(&study.to_json().unwrap()).unwrap();
        let g2 = reloaded.function("g").unwrap();
        let f2 = reloaded.function("f").unwrap();
        match g2.kind() {
            crate::FunctionKind::Product(terms) => {
                assert!(terms.left().ptr_eq(terms.right()));
                assert!(terms.left().ptr_eq(&f2));
            }
            other => panic!("expected a product, got {:?}", other),
        }
    }

    #[test]
    fn test_unsavable_function() {
        let f = crate::AnalyticalFunction::new(1, 1)
            .eval(|x| vec![x[0].sin()])
            .build()
            .unwrap();
        let mut study = Study::new();
        assert!(matches!(
            study.add("f", &f),
            Err(FunctionError::Persistence(_))
        ));
    }
}
