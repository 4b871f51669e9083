/// Summary of the on-disk response cache.
#[derive(Debug, Default, PartialEq)]
pub struct CacheStats {
    pub entries: usize,
    pub total_bytes: usize,
    pub oldest: Option<String>,
    pub newest: Option<String>,
}
