use core::ops::{Index, IndexMut};

use tilemm_runtime::server::ExecutionError;

use crate::element::Element;

/// Square host matrix stored in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<E> {
    size: usize,
    data: Vec<E>,
}

impl<E: Element> Matrix<E> {
    /// Create a matrix from its row-major data.
    pub fn new(size: usize, data: Vec<E>) -> Result<Self, ExecutionError> {
        let expected = size.checked_mul(size);
        if expected != Some(data.len()) {
            return Err(ExecutionError::InvalidInput {
                reason: format!(
                    "A {size}x{size} matrix can't be built from {} elements",
                    data.len()
                ),
            });
        }

        Ok(Self { size, data })
    }

    /// A matrix filled with zeros.
    pub fn zeros(size: usize) -> Self {
        Self {
            size,
            data: vec![E::zeroed(); size * size],
        }
    }

    /// A matrix where each element is computed from its `(row, col)` position.
    pub fn from_fn<F: FnMut(usize, usize) -> E>(size: usize, mut func: F) -> Self {
        let mut data = Vec::with_capacity(size * size);
        for row in 0..size {
            for col in 0..size {
                data.push(func(row, col));
            }
        }

        Self { size, data }
    }

    /// Number of rows, equal to the number of columns.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Row-major elements.
    pub fn data(&self) -> &[E] {
        &self.data
    }

    /// Mutable row-major elements.
    pub fn data_mut(&mut self) -> &mut [E] {
        &mut self.data
    }

    /// Consume the matrix and return its row-major elements.
    pub fn into_data(self) -> Vec<E> {
        self.data
    }

    /// Row-major elements as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }
}

impl<E> Index<(usize, usize)> for Matrix<E> {
    type Output = E;

    fn index(&self, (row, col): (usize, usize)) -> &Self::Output {
        &self.data[row * self.size + col]
    }
}

impl<E> IndexMut<(usize, usize)> for Matrix<E> {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut Self::Output {
        &mut self.data[row * self.size + col]
    }
}
