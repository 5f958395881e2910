//! Fixed-size pages assembled from however many store calls it takes.
//!
//! The store decides how many items one call returns, and filters can make
//! that number anything from zero upwards. The assembler keeps calling until
//! it holds one item more than the page size, trims to the page size and
//! takes the cursor from the last item it kept. Re-submitting that cursor as
//! an exclusive start key resumes strictly after the last item shown.

use dynadmin_model::attribute_value::Item;
use tracing::{debug, warn};

use crate::error::AdminError;
use crate::key_codec::{CompositeKey, extract_key};
use crate::paginator::{CallResult, Paginator};
use crate::schema::KeyAttribute;
use crate::store::{ReadMode, ReadRequest, TableStore};

/// One page of items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// At most `page_size` items, in store order.
    pub items: Vec<Item>,
    /// Where the next page starts, `None` on the last page.
    pub next_cursor: Option<CompositeKey>,
    /// The call cap stopped the walk before the page filled up. The items
    /// are complete up to `next_cursor`, which is the store's own token.
    pub truncated: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct PageAssembler<'a> {
    store: &'a dyn TableStore,
    paginator: Paginator,
}

impl<'a> PageAssembler<'a> {
    #[must_use]
    pub fn new(store: &'a dyn TableStore, paginator: Paginator) -> Self {
        Self { store, paginator }
    }

    /// Assemble a page of at most `page_size` items, starting after
    /// `start_key`.
    ///
    /// `cursor_key_attributes` are the attributes the cursor is built from:
    /// the table key, plus the index key when `request` reads an index.
    /// Any failing store call fails the whole page.
    pub async fn get_page(
        &self,
        cursor_key_attributes: &[KeyAttribute],
        request: &ReadRequest,
        mode: ReadMode,
        page_size: usize,
        start_key: Option<Item>,
    ) -> Result<Page, AdminError> {
        if page_size == 0 {
            return Err(AdminError::Validation(
                "page size must be at least 1".to_owned(),
            ));
        }

        let store = self.store;
        let issue_call = |start: Option<Item>| {
            let call = ReadRequest {
                exclusive_start_key: start,
                ..request.clone()
            };
            async move {
                let page = store.read(&call, mode).await?;
                Ok::<_, AdminError>(CallResult {
                    items: page.items,
                    next_start_key: page.next_start_key,
                })
            }
        };
        let result = self
            .paginator
            .paginate(issue_call, start_key, |items: &[Item], last: Option<&Item>| {
                items.len() > page_size || last.is_none()
            })
            .await?;

        let mut items = result.items;
        let page = if items.len() > page_size {
            items.truncate(page_size);
            let next_cursor = extract_key(&items[page_size - 1], cursor_key_attributes)?;
            Page {
                items,
                next_cursor: Some(next_cursor),
                truncated: false,
            }
        } else if result.capped {
            let next_cursor = result
                .last_start_key
                .map(|token| extract_key(&token, cursor_key_attributes))
                .transpose()?;
            warn!(
                table = %request.table_name,
                calls = result.calls,
                items = items.len(),
                page_size,
                "Call cap reached before the page filled; returning a partial page"
            );
            Page {
                items,
                next_cursor,
                truncated: true,
            }
        } else {
            Page {
                items,
                next_cursor: None,
                truncated: false,
            }
        };

        debug!(
            table = %request.table_name,
            %mode,
            calls = result.calls,
            items = page.items.len(),
            has_next = page.next_cursor.is_some(),
            "Assembled page"
        );
        Ok(page)
    }
}
