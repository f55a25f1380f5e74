/// A zero-based page of entries, ordered by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub count: u32,
}

impl PageRequest {
    pub fn new(page: u32, count: u32) -> Self {
        Self { page, count }
    }

    /// Number of entries to skip. Cannot overflow: both factors fit in 32 bits.
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.count)
    }

    /// Builds a page from signed wire values, rejecting negatives.
    pub fn parse(page: i32, count: i32) -> Result<PageRequest, String> {
        let page = u32::try_from(page).map_err(|_| format!("{} is not a valid page", page))?;
        let count =
            u32::try_from(count).map_err(|_| format!("{} is not a valid page size", count))?;

        Ok(Self { page, count })
    }
}
