//! Schema of the sample data set.

use std::sync::Arc;

use stratum_core::Migration;

mod v2_0_0_create_sample_items;
mod v2_1_0_index_sample_tags;

pub fn migrations() -> Vec<Arc<dyn Migration>> {
    vec![
        Arc::new(v2_0_0_create_sample_items::CreateSampleItems),
        Arc::new(v2_1_0_index_sample_tags::IndexSampleTags),
    ]
}
