//! Page-by-page fetching shared by every exporter
//!
//! All platforms answer lists in pages, only the way to ask for the next page
//! changes. A fetcher turns an optional [`Cursor`] into a [`Page`], and
//! [`collect_pages`] follows the cursors, waiting a fixed delay between calls.
use std::{future::Future, time::Duration};

use log::{debug, info};
use serde::Deserialize;
use tokio::time::sleep;

use crate::errors::OrgMoverError;

/// Position of the next page to request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    /// GraphQL `endCursor`
    After(String),
    /// REST page number, starting at 1
    Page(u32),
    /// GitLab keyset pagination, last id seen
    IdAfter(u64),
    /// Bitbucket `nextPageStart`
    Start(u64),
}

impl Cursor {
    /// Page number of a REST cursor, 1 for the first page
    pub fn page_number(cursor: Option<&Cursor>) -> u32 {
        match cursor {
            Some(Cursor::Page(page)) => *page,
            _ => 1,
        }
    }
}

/// One page of results and where to find the next one
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Items of the page
    pub items: Vec<T>,
    /// Cursor of the next page, `None` on the last page
    pub next: Option<Cursor>,
}

impl<T> Page<T> {
    /// Page-number pagination: a full page means there may be another one
    pub fn numbered(items: Vec<T>, page: u32, per_page: u32) -> Self {
        let next = if !items.is_empty() && items.len() >= per_page as usize {
            Some(Cursor::Page(page + 1))
        } else {
            None
        };
        Self { items, next }
    }

    /// Keyset pagination: a full page continues after the id of its last item
    pub fn keyset(items: Vec<T>, per_page: u32, id_of: impl Fn(&T) -> u64) -> Self {
        let next = match items.last() {
            Some(last) if items.len() >= per_page as usize => Some(Cursor::IdAfter(id_of(last))),
            _ => None,
        };
        Self { items, next }
    }
}

/// GraphQL `pageInfo`
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Whether there are more items
    #[serde(default)]
    pub has_next_page: bool,
    /// Cursor of the last item of the page
    pub end_cursor: Option<String>,
}

/// GraphQL connection
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Connection<E> {
    /// Total number of items
    #[serde(default)]
    pub total_count: u64,
    /// Pagination info
    #[serde(default)]
    pub page_info: PageInfo,
    /// Edges of the page
    #[serde(default = "Vec::new")]
    pub edges: Vec<E>,
}

impl<E> Connection<E> {
    /// Connection without items, used to take ownership of a fetched page
    pub fn empty() -> Self {
        Self {
            total_count: 0,
            page_info: PageInfo::default(),
            edges: vec![],
        }
    }

    /// Convert to a page following `endCursor`
    pub fn into_page(self) -> Page<E> {
        let next = if self.page_info.has_next_page {
            self.page_info.end_cursor.map(Cursor::After)
        } else {
            None
        };
        Page {
            items: self.edges,
            next,
        }
    }
}

/// GraphQL edge holding only a node
#[derive(Deserialize, Debug, Clone)]
pub struct Edge<N> {
    /// Node of the edge
    pub node: N,
}

/// Bitbucket Server paged response
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PagedResponse<T> {
    /// Items of the page
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,
    /// Whether this is the last page
    #[serde(default = "default_last_page")]
    pub is_last_page: bool,
    /// Start of the next page
    pub next_page_start: Option<u64>,
}

/// A page without `isLastPage` is treated as the last one
fn default_last_page() -> bool {
    true
}

impl<T> PagedResponse<T> {
    /// Convert to a page following `nextPageStart`
    pub fn into_page(self) -> Page<T> {
        let next = match (self.is_last_page, self.next_page_start) {
            (false, Some(start)) => Some(Cursor::Start(start)),
            _ => None,
        };
        Page {
            items: self.values,
            next,
        }
    }
}

/// Fixed delay between two requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    /// Delay to wait
    delay: Duration,
}

impl Throttle {
    /// Throttle waiting `secs` seconds, 0 disables it
    pub fn from_secs(secs: u64) -> Self {
        Self {
            delay: Duration::from_secs(secs),
        }
    }

    /// Same throttle waiting `factor` times longer
    pub fn scaled(&self, factor: u32) -> Self {
        Self {
            delay: self.delay * factor,
        }
    }

    /// Wait for the delay
    pub async fn wait(&self) {
        if self.delay.is_zero() {
            return;
        }
        debug!("delay: {} seconds", self.delay.as_secs_f32());
        sleep(self.delay).await;
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::from_secs(1)
    }
}

/// Fetch every page, waiting between requests, and return all items in order
/// # Errors
/// Error of the first page that can't be fetched
pub async fn collect_pages<T, F, Fut>(
    throttle: &Throttle,
    label: &str,
    mut fetch: F,
) -> Result<Vec<T>, OrgMoverError>
where
    F: FnMut(Option<Cursor>) -> Fut,
    Fut: Future<Output = Result<Page<T>, OrgMoverError>>,
{
    let mut all_items = vec![];
    let mut cursor = None;
    let mut page_count: usize = 1;
    loop {
        let page = fetch(cursor.take()).await?;
        info!(
            "Requested {label} (page {page_count}): {}",
            page.items.len()
        );
        all_items.extend(page.items);
        throttle.wait().await;
        match page.next {
            Some(next) => {
                debug!("Next {label} page at {next:?}");
                cursor = Some(next);
                page_count += 1;
            }
            None => break,
        }
    }
    Ok(all_items)
}

/// Follow a connection nested in an item until its last page
/// # Errors
/// Error of the first page that can't be fetched
pub async fn complete_connection<E, F, Fut>(
    first: Connection<E>,
    throttle: &Throttle,
    mut fetch: F,
) -> Result<Vec<E>, OrgMoverError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Connection<E>, OrgMoverError>>,
{
    let mut page = first.into_page();
    let mut items = vec![];
    loop {
        items.extend(page.items);
        match page.next {
            Some(Cursor::After(after)) => {
                throttle.wait().await;
                page = fetch(after).await?.into_page();
            }
            _ => return Ok(items),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbered_pages_stop_on_short_page() {
        let page = Page::numbered(vec![1, 2, 3], 1, 3);
        assert_eq!(page.next, Some(Cursor::Page(2)));
        let page = Page::numbered(vec![1, 2], 2, 3);
        assert_eq!(page.next, None);
        let page = Page::<u8>::numbered(vec![], 1, 0);
        assert_eq!(page.next, None);
    }

    #[test]
    fn keyset_pages_continue_after_last_id() {
        let page = Page::keyset(vec![(4, "a"), (9, "b")], 2, |item| item.0);
        assert_eq!(page.next, Some(Cursor::IdAfter(9)));
        let page = Page::keyset(vec![(4, "a")], 2, |item| item.0);
        assert_eq!(page.next, None);
    }

    #[test]
    fn graphql_connection_follows_end_cursor() {
        let connection: Connection<Edge<serde_json::Value>> = serde_json::from_value(json!({
            "totalCount": 3,
            "pageInfo": { "hasNextPage": true, "endCursor": "Y3Vyc29yOjI=" },
            "edges": [{ "node": { "name": "a" } }, { "node": { "name": "b" } }]
        }))
        .unwrap();
        assert_eq!(connection.total_count, 3);
        let page = connection.into_page();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.next, Some(Cursor::After("Y3Vyc29yOjI=".into())));

        let connection: Connection<Edge<serde_json::Value>> = serde_json::from_value(json!({
            "totalCount": 1,
            "pageInfo": { "hasNextPage": false, "endCursor": "Y3Vyc29yOjE=" },
            "edges": [{ "node": { "name": "a" } }]
        }))
        .unwrap();
        assert_eq!(connection.into_page().next, None);
    }

    #[test]
    fn bitbucket_page_follows_next_start() {
        let response: PagedResponse<serde_json::Value> = serde_json::from_value(json!({
            "size": 1,
            "limit": 1,
            "isLastPage": false,
            "start": 0,
            "nextPageStart": 1,
            "values": [{ "name": "repo" }]
        }))
        .unwrap();
        assert_eq!(response.into_page().next, Some(Cursor::Start(1)));

        let response: PagedResponse<serde_json::Value> =
            serde_json::from_value(json!({ "values": [] })).unwrap();
        assert_eq!(response.into_page().next, None);
    }

    #[test]
    fn page_number_defaults_to_one() {
        assert_eq!(Cursor::page_number(None), 1);
        assert_eq!(Cursor::page_number(Some(&Cursor::Page(4))), 4);
        assert_eq!(Cursor::page_number(Some(&Cursor::Start(4))), 1);
    }

    #[tokio::test]
    async fn collect_pages_follows_cursors() {
        let throttle = Throttle::from_secs(0);
        let mut requested = vec![];
        let items = collect_pages(&throttle, "numbers", |cursor| {
            requested.push(cursor.clone());
            let page = Cursor::page_number(cursor.as_ref());
            let items: Vec<u32> = match page {
                1 => vec![1, 2],
                2 => vec![3, 4],
                _ => vec![5],
            };
            async move { Ok(Page::numbered(items, page, 2)) }
        })
        .await
        .unwrap();
        assert_eq!(items, vec![1, 2, 3, 4, 5]);
        assert_eq!(
            requested,
            vec![None, Some(Cursor::Page(2)), Some(Cursor::Page(3))]
        );
    }

    #[tokio::test]
    async fn collect_pages_stops_on_error() {
        let throttle = Throttle::from_secs(0);
        let result = collect_pages(&throttle, "numbers", |cursor| async move {
            match cursor {
                None => Ok(Page {
                    items: vec![1],
                    next: Some(Cursor::Page(2)),
                }),
                Some(_) => Err(OrgMoverError::from("second page failed")),
            }
        })
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn throttle_scales() {
        let throttle = Throttle::from_secs(2).scaled(4);
        assert_eq!(throttle, Throttle::from_secs(8));
    }

    #[tokio::test]
    async fn nested_connection_is_completed() {
        let first: Connection<u32> = Connection {
            total_count: 3,
            page_info: PageInfo {
                has_next_page: true,
                end_cursor: Some("c1".into()),
            },
            edges: vec![1],
        };
        let mut cursors = vec![];
        let items = complete_connection(first, &Throttle::from_secs(0), |after| {
            cursors.push(after.clone());
            async move {
                Ok(match after.as_str() {
                    "c1" => Connection {
                        total_count: 3,
                        page_info: PageInfo {
                            has_next_page: true,
                            end_cursor: Some("c2".into()),
                        },
                        edges: vec![2],
                    },
                    _ => Connection {
                        total_count: 3,
                        page_info: PageInfo::default(),
                        edges: vec![3],
                    },
                })
            }
        })
        .await
        .unwrap();
        assert_eq!(items, vec![1, 2, 3]);
        assert_eq!(cursors, vec!["c1", "c2"]);
    }
}
