//! Streams the items of a paginated endpoint one page at a time.

use crate::engine::CancelToken;
use crate::engine::gitlab::{ApiError, GitLabApi};
use crate::{Job, Project};

/// Why a [`PagedLister`] stopped yielding items.
#[derive(Debug, PartialEq, Eq)]
pub enum ListEnd {
    /// An empty page was returned.
    Exhausted,
    /// A page request failed; items from earlier pages were still yielded.
    Failed { page: u32, error: ApiError },
    /// The run was cancelled before the next page request.
    Cancelled,
    /// The caller stopped iterating before the stream ended.
    Interrupted,
}

/// Iterator over every item of a paginated listing.
///
/// Starts at page 1 and moves to the next page after every successful response, so the same page
/// is never requested twice. Only one page is held in memory. Errors are not retried: they end
/// the stream and are reported by [`finish`](Self::finish).
pub struct PagedLister<T, F>
where
    F: FnMut(u32) -> Result<Vec<T>, ApiError>,
{
    fetch: F,
    next_page: u32,
    buffer: std::vec::IntoIter<T>,
    end: Option<ListEnd>,
    cancel: CancelToken,
}

impl<T, F> PagedLister<T, F>
where
    F: FnMut(u32) -> Result<Vec<T>, ApiError>,
{
    pub fn new(cancel: CancelToken, fetch: F) -> Self {
        Self {
            fetch,
            next_page: 1,
            buffer: Vec::new().into_iter(),
            end: None,
            cancel,
        }
    }

    /// Number of successful page requests so far.
    pub fn pages_fetched(&self) -> u32 {
        self.next_page - 1
    }

    pub fn finish(self) -> ListEnd {
        self.end.unwrap_or(ListEnd::Interrupted)
    }
}

impl<T, F> Iterator for PagedLister<T, F>
where
    F: FnMut(u32) -> Result<Vec<T>, ApiError>,
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        loop {
            if let Some(item) = self.buffer.next() {
                return Some(item);
            }
            if self.end.is_some() {
                return None;
            }
            if self.cancel.is_cancelled() {
                self.end = Some(ListEnd::Cancelled);
                return None;
            }
            let page = self.next_page;
            match (self.fetch)(page) {
                Err(error) => {
                    self.end = Some(ListEnd::Failed { page, error });
                    return None;
                }
                Ok(items) => {
                    self.next_page += 1;
                    if items.is_empty() {
                        self.end = Some(ListEnd::Exhausted);
                        return None;
                    }
                    self.buffer = items.into_iter();
                }
            }
        }
    }
}

/// Lister over the projects visible to the API token.
pub fn project_lister<'a>(
    api: &'a dyn GitLabApi,
    per_page: u32,
    cancel: CancelToken,
) -> PagedLister<Project, impl FnMut(u32) -> Result<Vec<Project>, ApiError> + 'a> {
    PagedLister::new(cancel, move |page| api.list_projects(page, per_page))
}

/// Lister over the finished jobs of one project.
pub fn job_lister<'a>(
    api: &'a dyn GitLabApi,
    project_id: u64,
    per_page: u32,
    cancel: CancelToken,
) -> PagedLister<Job, impl FnMut(u32) -> Result<Vec<Job>, ApiError> + 'a> {
    PagedLister::new(cancel, move |page| api.list_jobs(project_id, page, per_page))
}
