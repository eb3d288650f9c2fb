// Shared helpers for the model-layer unit tests (NdArray backend, CPU only).

use burn::{prelude::*, tensor::TensorData};

pub type TestBackend         = burn::backend::NdArray;
pub type TestAutodiffBackend = burn::backend::Autodiff<TestBackend>;

pub fn floats<const D: usize>(values: Vec<f32>, shape: [usize; D]) -> Tensor<TestBackend, D> {
    Tensor::from_data(TensorData::new(values, shape), &Default::default())
}

pub fn ints<const D: usize>(values: Vec<i64>, shape: [usize; D]) -> Tensor<TestBackend, D, Int> {
    Tensor::from_data(TensorData::new(values, shape), &Default::default())
}

/// Deterministic, non-trivial float data: 0.01, 0.02, ... wrapped into [-1, 1).
pub fn ramp<const D: usize>(shape: [usize; D]) -> Tensor<TestBackend, D> {
    let len: usize = shape.iter().product();
    let values = (0..len)
        .map(|i| ((i * 37 % 200) as f32 / 100.0) - 1.0)
        .collect();
    floats(values, shape)
}

pub fn values<const D: usize>(tensor: Tensor<TestBackend, D>) -> Vec<f32> {
    tensor.into_data().to_vec::<f32>().unwrap()
}

pub fn bools<const D: usize>(tensor: Tensor<TestBackend, D, Bool>) -> Vec<bool> {
    tensor
        .int()
        .into_data()
        .to_vec::<i64>()
        .unwrap()
        .into_iter()
        .map(|v| v != 0)
        .collect()
}

pub fn assert_close(actual: &[f32], expected: &[f32], tol: f32) {
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!((a - e).abs() <= tol, "index {i}: {a} vs {e} (tol {tol})");
    }
}

/// Fresh, empty directory under the system temp dir, unique per test name and process.
pub fn scratch_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("qa_transformer_{name}_{}", std::process::id()));
    std::fs::remove_dir_all(&dir).ok();
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
