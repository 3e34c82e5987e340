/// Source of primary keys for inserted rows.
pub trait IdGenerator: Send + Sync + 'static {
    fn generate(&self, table: &str, count: usize) -> Vec<String>;
}

/// UUID v4 ids in simple (32 hex characters) form.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self, _table: &str, count: usize) -> Vec<String> {
        (0..count)
            .map(|_| uuid::Uuid::new_v4().simple().to_string())
            .collect()
    }
}
