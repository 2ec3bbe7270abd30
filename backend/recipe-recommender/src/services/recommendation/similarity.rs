// ============================================
// Interaction & Similarity Matrices
// ============================================
//
// InteractionMatrix: dense users × recipes matrix of accumulated behavior
// scores, built from a profile store snapshot. Each build carries a
// generation number.
//
// SimilarityMatrix: cosine similarity over the rows (user axis) or the
// columns (item axis), tagged with the generation it was computed from.
// A similarity matrix whose generation differs from the current
// interaction matrix is stale.
//
// Formula:
//   sim(a, b) = (a · b) / ((‖a‖ + ε) × (‖b‖ + ε))

use crate::services::profile::UserProfileStore;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Which vectors a similarity matrix compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityAxis {
    User,
    Item,
}

impl SimilarityAxis {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimilarityAxis::User => "user",
            SimilarityAxis::Item => "item",
        }
    }
}

#[derive(Debug, Clone)]
pub struct InteractionMatrix {
    generation: u64,
    user_ids: Vec<String>,
    recipe_ids: Vec<String>,
    user_index: HashMap<String, usize>,
    recipe_index: HashMap<String, usize>,
    /// rows = users, columns = recipes
    values: Array2<f64>,
}

impl InteractionMatrix {
    /// Snapshot every profile's dynamic behavior into a dense matrix.
    ///
    /// Rows follow the store's sorted user order; columns are the sorted
    /// union of recipe ids any user interacted with.
    pub fn build(store: &UserProfileStore, generation: u64) -> Self {
        let user_ids = store.list_user_ids();
        let recipe_ids: Vec<String> = store
            .iter()
            .flat_map(|(_, profile)| profile.dynamic_behavior.keys())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let user_index: HashMap<String, usize> = user_ids
            .iter()
            .enumerate()
            .map(|(idx, id)| (id.clone(), idx))
            .collect();
        let recipe_index: HashMap<String, usize> = recipe_ids
            .iter()
            .enumerate()
            .map(|(idx, id)| (id.clone(), idx))
            .collect();

        let mut values = Array2::<f64>::zeros((user_ids.len(), recipe_ids.len()));
        for (user_id, profile) in store.iter() {
            let row = user_index[user_id];
            for (recipe_id, score) in &profile.dynamic_behavior {
                values[[row, recipe_index[recipe_id]]] = *score;
            }
        }

        Self {
            generation,
            user_ids,
            recipe_ids,
            user_index,
            recipe_index,
            values,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn user_count(&self) -> usize {
        self.user_ids.len()
    }

    pub fn recipe_count(&self) -> usize {
        self.recipe_ids.len()
    }

    pub fn user_index(&self, user_id: &str) -> Option<usize> {
        self.user_index.get(user_id).copied()
    }

    pub fn recipe_index(&self, recipe_id: &str) -> Option<usize> {
        self.recipe_index.get(recipe_id).copied()
    }

    pub fn user_id(&self, idx: usize) -> &str {
        &self.user_ids[idx]
    }

    pub fn recipe_id(&self, idx: usize) -> &str {
        &self.recipe_ids[idx]
    }

    /// One user's interaction vector (a row).
    pub fn user_vector(&self, idx: usize) -> ArrayView1<'_, f64> {
        self.values.row(idx)
    }

    /// Interaction value for (user, recipe), 0.0 when absent.
    pub fn get(&self, user_idx: usize, recipe_idx: usize) -> f64 {
        self.values[[user_idx, recipe_idx]]
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }
}

#[derive(Debug, Clone)]
pub struct SimilarityMatrix {
    axis: SimilarityAxis,
    generation: u64,
    values: Array2<f64>,
}

impl SimilarityMatrix {
    /// Pairwise cosine similarity for the given axis, self-pairs included.
    pub fn compute(matrix: &InteractionMatrix, axis: SimilarityAxis, epsilon: f64) -> Self {
        // Vectors are rows of the view: users as-is, items via the transpose
        let vectors = match axis {
            SimilarityAxis::User => matrix.values.view(),
            SimilarityAxis::Item => matrix.values.t(),
        };

        let count = vectors.nrows();
        let norms: Array1<f64> = vectors
            .axis_iter(Axis(0))
            .map(|v| v.dot(&v).sqrt() + epsilon)
            .collect();

        let mut values = Array2::<f64>::zeros((count, count));
        for i in 0..count {
            let a = vectors.row(i);
            for j in i..count {
                let similarity = a.dot(&vectors.row(j)) / (norms[i] * norms[j]);
                values[[i, j]] = similarity;
                values[[j, i]] = similarity;
            }
        }

        Self {
            axis,
            generation: matrix.generation,
            values,
        }
    }

    pub fn axis(&self) -> SimilarityAxis {
        self.axis
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_fresh_for(&self, matrix: &InteractionMatrix) -> bool {
        self.generation == matrix.generation
    }

    pub fn get(&self, a: usize, b: usize) -> f64 {
        self.values[[a, b]]
    }

    pub fn len(&self) -> usize {
        self.values.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
