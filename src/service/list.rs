use super::{column_ref, fetch_all, fetch_count, query_defines, select_columns, Dbop, Model, Record};
use crate::config::{HiddenScope, ModelDefine};
use crate::error::{DbopError, Stage};
use crate::params::{ParamValue, Params};
use crate::response::{ListPage, ShowIndexInfo};
use crate::session::Session;
use crate::sql::{self, assemble_where, build_condition, parse_joins, OrderBy, QuerySettings, SelectSpec};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 1000;

/// Page geometry: how many extra neighbor rows to fetch around the page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct PageWindow {
    pub page_count: i64,
    pub limit: i64,
    pub offset: i64,
    pub pre: i64,
    pub next: i64,
}

/// `pre`/`next` are 1 when the neighbor row exists and lookahead is enabled.
///
/// The offset saturates, so an absurd page number lands past the last row.
pub(crate) fn page_window(total: i64, page_number: i64, page_size: i64, lookahead: bool) -> PageWindow {
    let page_count = total.saturating_add(page_size - 1) / page_size;
    let offset = page_number.saturating_sub(1).saturating_mul(page_size);
    if !lookahead {
        return PageWindow {
            page_count,
            limit: page_size,
            offset,
            pre: 0,
            next: 0,
        };
    }
    let pre = i64::from(page_number > 1 && page_number <= page_count);
    let next = i64::from(page_number < page_count);
    PageWindow {
        page_count,
        limit: page_size + pre + next,
        offset: offset - pre,
        pre,
        next,
    }
}

fn page_size(params: &Params) -> i64 {
    if !params.has("_pageSize") {
        return DEFAULT_PAGE_SIZE;
    }
    let size = params.get_int("_pageSize");
    if (1..=MAX_PAGE_SIZE).contains(&size) {
        size
    } else {
        DEFAULT_PAGE_SIZE
    }
}

fn page_number(params: &Params) -> i64 {
    if params.has("_pageNumber") {
        params.get_int("_pageNumber").max(1)
    } else {
        1
    }
}

/// Records of one page plus what is needed to present them.
struct Listed {
    define: Arc<ModelDefine>,
    page: ListPage<Record>,
    hidden: Vec<String>,
}

impl Dbop {
    /// Filtered, ordered, paginated list.
    ///
    /// Every model field present in `params` filters the list. `_pageNumber`, `_pageSize`,
    /// `_orderBy` and `_order` control paging and ordering. Rows are redacted of fields
    /// hidden from lists.
    pub async fn list(
        &self,
        session: &mut dyn Session,
        model: &str,
        params: &Params,
        settings: Option<&QuerySettings>,
        joins: Option<&[Vec<String>]>,
    ) -> Result<ListPage, DbopError> {
        let Listed { define, page, hidden } = self.list_records(session, model, params, settings, joins).await?;
        let hidden: Vec<&str> = hidden.iter().map(String::as_str).collect();
        Ok(page.map_items(|r| {
            if hidden.is_empty() {
                Value::Object(r.to_nested(&define))
            } else {
                Value::Object(r.redacted(&define, &hidden))
            }
        }))
    }

    /// [`Dbop::list`] returning typed models. Hidden fields are never selected, so they
    /// deserialize from their serde defaults.
    pub async fn list_models<T: Model>(
        &self,
        session: &mut dyn Session,
        params: &Params,
        settings: Option<&QuerySettings>,
        joins: Option<&[Vec<String>]>,
    ) -> Result<ListPage<T>, DbopError> {
        let Listed { define, page, .. } = self
            .list_records(session, &T::model_name(), params, settings, joins)
            .await?;
        let items = page
            .items
            .iter()
            .map(|r| r.into_model(&define))
            .collect::<Result<Vec<T>, _>>()?;
        Ok(ListPage {
            page_number: page.page_number,
            page_size: page.page_size,
            total_count: page.total_count,
            page_count: page.page_count,
            show_index: page.show_index,
            list_key: page.list_key,
            items,
        })
    }

    async fn list_records(
        &self,
        session: &mut dyn Session,
        model: &str,
        params: &Params,
        settings: Option<&QuerySettings>,
        joins: Option<&[Vec<String>]>,
    ) -> Result<Listed, DbopError> {
        let define = self.define(model)?;
        let joins = parse_joins(joins.unwrap_or(&[]))?;
        let defines = query_defines(settings);
        let dialect = session.dialect();
        let mapper = session.column_mapper();
        let table = match defines.table_override() {
            Some(t) => t.to_string(),
            None => define.table_name(mapper),
        };

        // OR sources lend their value to every group member for this call only.
        let mut overlay: HashMap<&str, &ParamValue> = HashMap::new();
        let mut or_groups: Vec<&[String]> = Vec::new();
        for (source, members) in defines.or_groups() {
            if let Some(v) = params.get(source) {
                or_groups.push(members);
                for m in members {
                    overlay.insert(m.as_str(), v);
                }
            }
        }
        let value_of = |field: &str| overlay.get(field).copied().or_else(|| params.get(field));

        let mut conds = Vec::new();
        for field in define.fields() {
            if let Some(v) = value_of(field) {
                let column = column_ref(session, &define, field, defines.table(field));
                conds.push((field.clone(), build_condition(&column, v, defines.like(field))));
            }
        }
        let filter = assemble_where(conds, &or_groups);

        let q = sql::count(dialect, &table, &joins, filter.as_ref());
        let total = fetch_count(session, &q, Stage::Count, &define.name).await?;

        let page_size = page_size(params);
        let page_number = page_number(params);
        let show_index_field = define.show_index_field().map(str::to_string);
        let window = page_window(total, page_number, page_size, show_index_field.is_some());
        let mut show_index = show_index_field.as_ref().map(|_| ShowIndexInfo::default());

        let hidden: Vec<String> = define
            .hidden_fields(HiddenScope::List)
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut records = Vec::new();
        // Pages past the end have no rows to fetch.
        if total > 0 && window.offset < total {
            let hidden_refs: Vec<&str> = hidden.iter().map(String::as_str).collect();
            let columns = select_columns(session, &define, &table, &hidden_refs);

            let orders = params.get_string_array("_order");
            let order: Vec<OrderBy> = params
                .get_string_array("_orderBy")
                .iter()
                .enumerate()
                .map(|(i, f)| OrderBy {
                    column: column_ref(session, &define, f, defines.table(f)),
                    desc: orders.get(i).map(|o| !o.eq_ignore_ascii_case("asc")).unwrap_or(false),
                })
                .collect();

            let q = sql::select(
                dialect,
                &SelectSpec {
                    table: &table,
                    columns: &columns,
                    joins: &joins,
                    filter: filter.as_ref(),
                    order: &order,
                    limit: Some((window.limit.max(0) as u64, window.offset.max(0) as u64)),
                },
            );
            records = fetch_all(session, &q, Stage::Find, &define.name)
                .await?
                .into_iter()
                .map(|row| Record::from_row(&define, row, mapper))
                .collect::<Vec<_>>();

            if let (Some(field), Some(info)) = (show_index_field.as_deref(), show_index.as_mut()) {
                if window.pre > 0 && !records.is_empty() {
                    let first = records.remove(0);
                    info.pre = first.get(field).cloned().unwrap_or(Value::Null);
                }
                if window.next > 0 && records.len() as i64 > page_size {
                    if let Some(last) = records.pop() {
                        info.next = last.get(field).cloned().unwrap_or(Value::Null);
                    }
                }
            }
        }

        Ok(Listed {
            page: ListPage {
                page_number,
                page_size,
                total_count: total,
                page_count: window.page_count,
                show_index,
                list_key: format!("{}List", define.main_model_name),
                items: records,
            },
            define,
            hidden,
        })
    }
}
