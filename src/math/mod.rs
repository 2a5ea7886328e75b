pub mod matrix;
pub mod tensor;
