use crate::error::EngineError;
use num_traits::Float;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DataValidator<'a, T> {
    data: &'a [Vec<T>],
}

impl<'a, T: Float> DataValidator<'a, T> {
    pub(crate) fn new(data: &'a [Vec<T>]) -> Self {
        Self { data }
    }

    pub(crate) fn validate_input_data(&self) -> Result<(), EngineError> {
        if self.data.is_empty() {
            return Err(EngineError::EmptyDataset);
        }
        let dims_0th = self.data[0].len();
        if dims_0th == 0 {
            return Err(EngineError::WrongDimension(String::from(
                "0th vector has no dimensions",
            )));
        }
        for (n, datapoint) in self.data.iter().enumerate() {
            if datapoint.iter().any(|element| !element.is_finite()) {
                return Err(EngineError::NonFiniteCoordinate(format!(
                    "{n}th vector contains non-finite element(s)"
                )));
            }
            let dims_nth = datapoint.len();
            if dims_nth != dims_0th {
                return Err(EngineError::WrongDimension(format!(
                    "0th data point has {dims_0th} dimensions, but {n}th has {dims_nth}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_data() {
        let data = vec![vec![1.0_f32, 2.0], vec![3.0, 4.0]];
        assert!(DataValidator::new(&data).validate_input_data().is_ok());
    }

    #[test]
    fn empty_data() {
        let data: Vec<Vec<f32>> = Vec::new();
        let result = DataValidator::new(&data).validate_input_data();
        assert!(matches!(result, Err(EngineError::EmptyDataset)));
    }

    #[test]
    fn non_finite_coordinate() {
        let data = vec![vec![1.5, f32::NAN]];
        let result = DataValidator::new(&data).validate_input_data();
        assert!(matches!(result, Err(EngineError::NonFiniteCoordinate(..))));
    }

    #[test]
    fn mismatched_dimensions() {
        let data = vec![vec![1.5, 2.2], vec![1.0, 1.1], vec![1.2]];
        let result = DataValidator::new(&data).validate_input_data();
        assert!(matches!(result, Err(EngineError::WrongDimension(..))));
    }
}
