//! Dense value types consumed by the function nodes
//!
//! These are intentionally small: enough storage and arithmetic for the
//! differentiation rules, nothing more.

mod description;
mod matrix;
mod point;
mod sample;
mod tensor;

pub use description::Description;
pub use matrix::Matrix;
pub use point::Point;
pub use sample::Sample;
pub use tensor::SymmetricTensor;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_product() {
        let a = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]);
        let b = Matrix::from_rows(&[vec![0.0, 1.0], vec![1.0, 0.0]]);
        let c = &a * &b;
        assert_eq!(c, Matrix::from_rows(&[vec![2.0, 1.0], vec![4.0, 3.0]]));
    }

    #[test]
    fn test_matrix_vector_products() {
        let a = Matrix::from_rows(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        assert_eq!(a.mul_vec(&[1.0, 0.0, 1.0]), Point::from([4.0, 10.0]));
        assert_eq!(a.transpose_mul_vec(&[1.0, 1.0]), Point::from([5.0, 7.0, 9.0]));
        assert_eq!(a.transpose().transpose(), a);
    }

    #[test]
    fn test_stack_rows_from_empty() {
        let empty = Matrix::zeros(0, 0);
        let b = Matrix::from_rows(&[vec![1.0, 2.0]]);
        let s = empty.stack_rows(&b);
        assert_eq!(s, b);
    }

    #[test]
    fn test_sample_rows_and_columns() {
        let mut s = Sample::empty(3);
        s.push(&[1.0, 2.0, 3.0]);
        s.push(&[4.0, 5.0, 6.0]);
        assert_eq!(s.size(), 2);
        assert_eq!(s.point(1), Point::from([4.0, 5.0, 6.0]));
        let c = s.select_columns(&[2, 0]);
        assert_eq!(c.row(0), &[3.0, 1.0]);
        assert_eq!(c.row(1), &[6.0, 4.0]);
    }

    #[test]
    fn test_deserialize_checks_data_length() {
        let m: Matrix = serde_json::from_str(r#"{"rows": 2, "columns": 1, "data": [1.0, 2.0]}"#).unwrap();
        assert_eq!(m.column_values(0), Point::from([1.0, 2.0]));
        assert!(serde_json::from_str::<Matrix>(r#"{"rows": 1, "columns": 1, "data": []}"#).is_err());
        assert!(
            serde_json::from_str::<Sample>(r#"{"size": 2, "dimension": 2, "data": [1.0, 2.0, 3.0]}"#)
                .is_err()
        );
        let bad_sheet = r#"{"size": 2, "sheets": [{"rows": 1, "columns": 1, "data": [1.0]}]}"#;
        assert!(serde_json::from_str::<SymmetricTensor>(bad_sheet).is_err());
    }

    #[test]
    fn test_description_default() {
        let d = Description::build_default(3, "x");
        assert_eq!(d.len(), 3);
        assert_eq!(d[2], "x2");
        assert_eq!(d.select(&[1]).to_string(), "[x1]");
    }
}
