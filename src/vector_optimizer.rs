// Copyright 2026 Muvon Un Limited
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use lancedb::DistanceType;

/// Below this many rows an exact flat scan beats an approximate index
const MIN_ROWS_FOR_INDEX: usize = 1000;

/// Parameters for vector index optimization
#[derive(Debug)]
pub struct IndexParams {
    pub should_create_index: bool,
    pub num_partitions: u32,
    pub num_sub_vectors: u32,
    pub num_bits: usize,
    pub distance_type: DistanceType,
}

/// Sizes the IVF-PQ index of a freshly built knowledge base
pub struct VectorOptimizer;

impl VectorOptimizer {
    /// Calculate optimal index parameters based on dataset size
    pub fn calculate_index_params(row_count: usize, vector_dim: usize) -> IndexParams {
        if row_count < MIN_ROWS_FOR_INDEX {
            return IndexParams {
                should_create_index: false,
                num_partitions: 0,
                num_sub_vectors: 0,
                num_bits: 0,
                distance_type: DistanceType::Cosine,
            };
        }

        // sqrt of row count, min 2, max 256
        let num_partitions = ((row_count as f64).sqrt() as u32).clamp(2, 256);

        // Sub-vectors must divide the dimension; prefer dim / 8, max 96
        let mut num_sub_vectors = ((vector_dim / 8) as u32).clamp(1, 96);
        while num_sub_vectors > 1 && vector_dim % num_sub_vectors as usize != 0 {
            num_sub_vectors -= 1;
        }

        IndexParams {
            should_create_index: true,
            num_partitions,
            num_sub_vectors,
            num_bits: 8,
            distance_type: DistanceType::Cosine,
        }
    }
}
