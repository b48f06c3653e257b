//! Page-number pagination: request parameters, decoded pages and a cursor that
//! walks every page of one logical call.

use crate::core::errors::ExchangeError;
use crate::core::kernel::request::{Params, RequestDescriptor};
use crate::core::kernel::rest::RestClient;
use futures_util::stream::{self, Stream};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::value::RawValue;
use tracing::debug;

pub const DEFAULT_PAGE_SIZE: u64 = 50;

/// Requested page. Both fields are at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationParam {
    pub current_page: u64,
    pub page_size: u64,
}

impl Default for PaginationParam {
    fn default() -> Self {
        Self {
            current_page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PaginationParam {
    pub fn new(current_page: u64, page_size: u64) -> Self {
        Self {
            current_page: current_page.max(1),
            page_size: page_size.max(1),
        }
    }

    /// Write `currentPage` and `pageSize` into `params`.
    pub fn read_param(&self, params: &mut Params) {
        params.insert("currentPage", self.current_page.to_string());
        params.insert("pageSize", self.page_size.to_string());
    }

    /// The following page with the same size.
    #[must_use]
    pub fn next(&self) -> Self {
        Self {
            current_page: self.current_page + 1,
            page_size: self.page_size,
        }
    }
}

/// One decoded page whose items are still raw JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationPage {
    pub current_page: u64,
    pub page_size: u64,
    pub total_num: u64,
    pub total_page: u64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub items: Vec<Box<RawValue>>,
}

impl PaginationPage {
    /// `ceil(total_num / page_size)`, or 0 when the page size is 0.
    pub fn expected_total_page(&self) -> u64 {
        if self.page_size == 0 {
            0
        } else {
            self.total_num.div_ceil(self.page_size)
        }
    }

    /// Whether the server's `totalPage` agrees with its item count.
    pub fn is_consistent(&self) -> bool {
        self.page_size == 0 || self.total_page == self.expected_total_page()
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_page
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Decode the items of this page into the caller's shape.
    pub fn read_items<T: DeserializeOwned>(&self) -> Result<Vec<T>, ExchangeError> {
        self.items
            .iter()
            .map(|item| {
                serde_json::from_str(item.get()).map_err(|e| {
                    ExchangeError::decode(
                        format!("Failed to decode page item: {}", e),
                        item.get().as_bytes(),
                    )
                })
            })
            .collect()
    }

    pub fn into_typed<T: DeserializeOwned>(self) -> Result<Page<T>, ExchangeError> {
        Ok(Page {
            items: self.read_items()?,
            current_page: self.current_page,
            page_size: self.page_size,
            total_num: self.total_num,
            total_page: self.total_page,
        })
    }
}

/// A page with typed items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub current_page: u64,
    pub page_size: u64,
    pub total_num: u64,
    pub total_page: u64,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.current_page < self.total_page
    }
}

/// Cursor over every page of one logical call.
///
/// Keep time-range filters fixed in the request for the whole walk, otherwise
/// pages may overlap or skip items.
pub struct Paginator<'a, R: ?Sized> {
    client: &'a R,
    request: RequestDescriptor,
    next: Option<PaginationParam>,
}

impl<'a, R: RestClient + ?Sized + 'a> Paginator<'a, R> {
    pub fn new(client: &'a R, request: RequestDescriptor, start: PaginationParam) -> Self {
        Self {
            client,
            request,
            next: Some(start),
        }
    }

    /// Fetch the next page, `None` once the last page has been returned.
    pub async fn next_page(&mut self) -> Result<Option<PaginationPage>, ExchangeError> {
        let Some(param) = self.next else {
            return Ok(None);
        };

        let page = self.client.call_paginated(&self.request, &param).await?;
        self.next = (param.current_page < page.total_page && !page.is_empty()).then(|| param.next());

        debug!(
            path = %self.request.path(),
            current_page = param.current_page,
            total_page = page.total_page,
            items = page.len(),
            "Fetched page"
        );

        Ok(Some(page))
    }

    /// Lazy stream of the remaining pages. Ends after the last page or the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<PaginationPage, ExchangeError>> + 'a {
        stream::try_unfold(self, |mut pager| async move {
            let page = pager.next_page().await?;
            Ok::<_, ExchangeError>(page.map(|page| (page, pager)))
        })
    }

    /// Walk every remaining page and decode all items.
    pub async fn collect_items<T: DeserializeOwned>(mut self) -> Result<Vec<T>, ExchangeError> {
        let mut items = Vec::new();
        while let Some(page) = self.next_page().await? {
            items.extend(page.read_items::<T>()?);
        }
        Ok(items)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Box<RawValue>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Box<RawValue>>>::deserialize(deserializer)?.unwrap_or_default())
}
