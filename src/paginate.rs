//! Sequential pagination of one logical fetch.

use crate::client::{PageSource, TaskPage};
use crate::errors::{FetchError, QueryError};
use crate::models::Task;
use crate::query::TaskQuery;
use futures::future::try_join_all;
use futures::stream::{self, Stream, TryStreamExt};
use tracing::{debug, error, info};

/// Both kinds travel as the `start` parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCursor {
    Offset(u64),
    Server(String),
}

impl PageCursor {
    pub fn start(&self) -> String {
        match self {
            Self::Offset(offset) => offset.to_string(),
            Self::Server(token) => token.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PageOptions {
    pub page_size: u64,
    pub max_pages: usize,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            page_size: 50,
            max_pages: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageState {
    pub cursor: PageCursor,
    pub page_size: u64,
    pub pages: u64,
    pub fetched: u64,
    pub largest_page: u64,
}

impl PageState {
    pub fn first(page_size: u64) -> Self {
        Self {
            cursor: PageCursor::Offset(0),
            page_size: page_size.max(1),
            pages: 0,
            fetched: 0,
            largest_page: 0,
        }
    }

    /// `None` once `page` was the last. The server picks its own page
    /// length, so offsets move by records received and a page only counts as
    /// short against the longest one seen before it.
    pub fn advance(self, page: &TaskPage) -> Result<Option<PageState>, FetchError> {
        let received = page.tasks.len() as u64;
        let fetched = self.fetched + received;

        if received == 0 {
            return match page.total {
                Some(total) if fetched < total => Err(FetchError::Truncated { fetched, total }),
                _ => Ok(None),
            };
        }

        let cursor = if let Some(token) = &page.next {
            PageCursor::Server(token.clone())
        } else {
            let finished = match page.total {
                Some(total) => fetched >= total,
                None => received < self.page_size.min(self.largest_page),
            };
            if finished {
                return Ok(None);
            }
            PageCursor::Offset(fetched)
        };

        Ok(Some(PageState {
            cursor,
            page_size: self.page_size,
            pages: self.pages + 1,
            fetched,
            largest_page: self.largest_page.max(received),
        }))
    }
}

pub fn pages<'a, S>(
    source: &'a S,
    query: &'a TaskQuery,
    options: PageOptions,
) -> impl Stream<Item = Result<Vec<Task>, FetchError>> + 'a
where
    S: PageSource + ?Sized,
{
    stream::try_unfold(Some(PageState::first(options.page_size)), move |state| async move {
        let Some(state) = state else {
            return Ok(None);
        };
        if state.pages as usize >= options.max_pages {
            return Err(FetchError::PageLimit {
                limit: options.max_pages,
            });
        }
        debug!(
            "fetching '{}' page {} (start {})",
            query.label(),
            state.pages,
            state.cursor.start()
        );
        let page = source.fetch_page(query, &state.cursor).await?;
        let next = state.advance(&page)?;
        Ok(Some((page.tasks, next)))
    })
}

pub async fn fetch_all<S>(source: &S, query: &TaskQuery, options: PageOptions) -> Result<Vec<Task>, QueryError>
where
    S: PageSource + ?Sized,
{
    let result = pages(source, query, options)
        .try_fold(Vec::new(), |mut collected, page| async move {
            collected.extend(page);
            Ok::<_, FetchError>(collected)
        })
        .await;

    match result {
        Ok(tasks) => {
            info!("fetched '{}': {} records", query.label(), tasks.len());
            Ok(tasks)
        }
        Err(err) => {
            error!("fetch '{}' aborted: {err}", query.label());
            Err(QueryError::new(query.label(), err))
        }
    }
}

pub async fn fetch_all_joined<S>(
    source: &S,
    queries: &[TaskQuery],
    options: PageOptions,
) -> Result<Vec<Vec<Task>>, QueryError>
where
    S: PageSource + ?Sized,
{
    try_join_all(queries.iter().map(|query| fetch_all(source, query, options))).await
}
