// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Line-oriented terminal front end. It only drives the list controllers,
//! editors and reports; all state worth keeping lives below it.

use anyhow::{Context, Result, anyhow};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use crate::audit::AuditSink;
use crate::controller::{ListController, View};
use crate::csv_io::{export_records, parse_records_csv};
use crate::db::Store;
use crate::editor::{Editor, ViewContext};
use crate::forms::{CategoryForm, RecordForm};
use crate::models::{Category, Record};
use crate::report::ReportAggregator;
use crate::settings::{AppSettings, PAGE_SIZE_OPTIONS};
use crate::store::{Entity, Gateway, SqliteAuditStore, SqliteGateway, ensure_user};
use crate::utils::{current_year, format_amount, pretty_table};

const HELP: &str = "\
views:   income | expenses | income-categories | expense-categories
paging:  next | prev | page <n> | search <text> | clear | refresh
edit:    add <category,month,year,amount>  (category views: add <name>)
         edit <row> <category,month,year,amount>  (blank fields are kept)
         delete <row>
records: import <file.csv> | export <file.csv>
other:   report [year] | dashboard | notifications | read | pagesize <5|10|20|30> | help | quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ViewKind {
    Income,
    Expenses,
    IncomeCategories,
    ExpenseCategories,
}

impl ViewKind {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "income" => Some(ViewKind::Income),
            "expenses" | "expense" => Some(ViewKind::Expenses),
            "income-categories" => Some(ViewKind::IncomeCategories),
            "expense-categories" => Some(ViewKind::ExpenseCategories),
            _ => None,
        }
    }
}

pub struct Shell {
    settings: AppSettings,
    settings_path: PathBuf,
    ctx: Arc<ViewContext>,
    income: Editor<Record>,
    expenses: Editor<Record>,
    income_categories: Editor<Category>,
    expense_categories: Editor<Category>,
    reports: ReportAggregator,
    active: ViewKind,
}

impl Shell {
    pub async fn open(
        store: Store,
        settings: AppSettings,
        settings_path: PathBuf,
        username: &str,
    ) -> Result<Self> {
        let session = ensure_user(&store, username)
            .await
            .with_context(|| format!("Load user '{}'", username))?;
        let sink = AuditSink::new(Arc::new(SqliteAuditStore::new(store.clone())));
        let ctx = Arc::new(ViewContext::new(session, sink));
        ctx.refresh_badge().await;

        let income = Arc::new(SqliteGateway::income(store.clone()));
        let expenses = Arc::new(SqliteGateway::expenses(store.clone()));
        let income_categories = Arc::new(SqliteGateway::income_categories(store.clone()));
        let expense_categories = Arc::new(SqliteGateway::expense_categories(store));

        let reports = ReportAggregator::new(income.clone(), expenses.clone());
        Ok(Self {
            income: Editor::new(
                ListController::<Record>::from_settings(income, &settings),
                Arc::clone(&ctx),
            ),
            expenses: Editor::new(
                ListController::<Record>::from_settings(expenses, &settings),
                Arc::clone(&ctx),
            ),
            income_categories: Editor::new(
                ListController::<Category>::from_settings(income_categories, &settings),
                Arc::clone(&ctx),
            ),
            expense_categories: Editor::new(
                ListController::<Category>::from_settings(expense_categories, &settings),
                Arc::clone(&ctx),
            ),
            settings,
            settings_path,
            ctx,
            reports,
            active: ViewKind::Income,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        println!(
            "Signed in as {}. Type 'help' for commands.",
            self.ctx.session.username
        );
        self.switch(ViewKind::Income).await?;
        loop {
            print!("fynance [{} unread]> ", self.ctx.unread());
            io::stdout().flush()?;
            let line = tokio::task::spawn_blocking(|| {
                let mut buf = String::new();
                io::stdin().lock().read_line(&mut buf).map(|n| (n, buf))
            })
            .await??;
            if line.0 == 0 {
                break;
            }
            let input = line.1.trim();
            if input.is_empty() {
                continue;
            }
            if matches!(input, "quit" | "exit") {
                break;
            }
            if let Err(err) = self.dispatch(input).await {
                println!("error: {err:#}");
            }
        }
        Ok(())
    }

    async fn dispatch(&mut self, input: &str) -> Result<()> {
        let (cmd, rest) = input.split_once(' ').unwrap_or((input, ""));
        let rest = rest.trim();
        match cmd {
            "help" => println!("{HELP}"),
            "report" => self.report(rest).await,
            "dashboard" => self.dashboard().await,
            "notifications" => self.notifications().await?,
            "read" => {
                let n = self.ctx.sink.mark_all_read(self.ctx.session.id).await?;
                self.ctx.refresh_badge().await;
                println!("Marked {} notification(s) as read", n);
            }
            "pagesize" => self.page_size(rest)?,
            "import" => self.import(rest).await?,
            "export" => self.export(rest).await?,
            "add" | "edit" | "delete" => {
                self.mutate(cmd, rest).await?;
                self.render();
            }
            other => {
                if let Some(kind) = ViewKind::parse(other) {
                    self.switch(kind).await?;
                } else {
                    self.navigate(cmd, rest).await?;
                }
            }
        }
        Ok(())
    }

    async fn switch(&mut self, kind: ViewKind) -> Result<()> {
        self.active = kind;
        let handle = match kind {
            ViewKind::Income => self.income.reopen(&self.settings),
            ViewKind::Expenses => self.expenses.reopen(&self.settings),
            ViewKind::IncomeCategories => self.income_categories.reopen(&self.settings),
            ViewKind::ExpenseCategories => self.expense_categories.reopen(&self.settings),
        };
        settle(handle).await?;
        self.render();
        Ok(())
    }

    async fn navigate(&mut self, cmd: &str, rest: &str) -> Result<()> {
        match self.active {
            ViewKind::Income => drive(self.income.controller_mut(), cmd, rest).await?,
            ViewKind::Expenses => drive(self.expenses.controller_mut(), cmd, rest).await?,
            ViewKind::IncomeCategories => {
                drive(self.income_categories.controller_mut(), cmd, rest).await?
            }
            ViewKind::ExpenseCategories => {
                drive(self.expense_categories.controller_mut(), cmd, rest).await?
            }
        }
        self.render();
        Ok(())
    }

    async fn mutate(&mut self, cmd: &str, rest: &str) -> Result<()> {
        let handle = match self.active {
            ViewKind::Income | ViewKind::Expenses => {
                let (editor, categories) = match self.active {
                    ViewKind::Income => (&mut self.income, &self.income_categories),
                    _ => (&mut self.expenses, &self.expense_categories),
                };
                let categories = Arc::clone(categories.controller().gateway());
                match cmd {
                    "add" => {
                        let form = record_form(rest, RecordForm::default());
                        editor.add_record(&form, categories.as_ref()).await?
                    }
                    "edit" => {
                        let (row, fields) = rest.split_once(' ').unwrap_or((rest, ""));
                        let existing = pick_row(editor.controller(), row)?;
                        let form = record_form(fields, RecordForm::from(&existing));
                        editor
                            .edit_record(&existing, &form, categories.as_ref())
                            .await?
                    }
                    _ => {
                        let existing = pick_row(editor.controller(), rest)?;
                        editor.delete(&existing).await?
                    }
                }
            }
            ViewKind::IncomeCategories | ViewKind::ExpenseCategories => {
                let editor = match self.active {
                    ViewKind::IncomeCategories => &mut self.income_categories,
                    _ => &mut self.expense_categories,
                };
                match cmd {
                    "add" => {
                        let form = CategoryForm {
                            name: rest.to_string(),
                        };
                        editor.add_category(&form).await?
                    }
                    "edit" => {
                        let (row, name) = rest.split_once(' ').unwrap_or((rest, ""));
                        let existing = pick_row(editor.controller(), row)?;
                        let form = CategoryForm {
                            name: name.to_string(),
                        };
                        editor.edit_category(&existing, &form).await?
                    }
                    _ => {
                        let existing = pick_row(editor.controller(), rest)?;
                        editor.delete(&existing).await?
                    }
                }
            }
        };
        settle(handle).await
    }

    fn render(&self) {
        match self.active {
            ViewKind::Income => render_records("Income", &self.income.controller().snapshot()),
            ViewKind::Expenses => {
                render_records("Expenses", &self.expenses.controller().snapshot())
            }
            ViewKind::IncomeCategories => render_categories(
                "Income categories",
                &self.income_categories.controller().snapshot(),
            ),
            ViewKind::ExpenseCategories => render_categories(
                "Expense categories",
                &self.expense_categories.controller().snapshot(),
            ),
        }
    }

    fn active_records(&self) -> Result<&Editor<Record>> {
        match self.active {
            ViewKind::Income => Ok(&self.income),
            ViewKind::Expenses => Ok(&self.expenses),
            _ => Err(anyhow!("switch to 'income' or 'expenses' first")),
        }
    }

    async fn import(&mut self, path: &str) -> Result<()> {
        if path.is_empty() {
            return Err(anyhow!("usage: import <file.csv>"));
        }
        let parsed = parse_records_csv(&PathBuf::from(path))?;
        let editor = match self.active {
            ViewKind::Income => &mut self.income,
            ViewKind::Expenses => &mut self.expenses,
            _ => return Err(anyhow!("switch to 'income' or 'expenses' first")),
        };
        let progress = |p: f32| eprint!("\rimporting... {:>3.0}%", p * 100.0);
        let (summary, handle) = editor.import(&parsed, Some(&progress)).await;
        eprintln!();
        println!(
            "Imported {} record(s), {} failed, {} row(s) skipped",
            summary.inserted, summary.failed, parsed.skipped
        );
        settle(handle).await?;
        self.render();
        Ok(())
    }

    async fn export(&self, path: &str) -> Result<()> {
        if path.is_empty() {
            return Err(anyhow!("usage: export <file.csv>"));
        }
        let rows = self.active_records()?.controller().gateway().find_all().await?;
        let n = export_records(&PathBuf::from(path), &rows)?;
        println!("Exported {} record(s) to {}", n, path);
        Ok(())
    }

    async fn report(&self, year: &str) {
        let report = if year.is_empty() {
            self.reports.build_current_year_report().await
        } else {
            self.reports
                .build_report(year, &crate::models::Month::ALL)
                .await
        };
        let rows = report
            .rows
            .iter()
            .map(|r| {
                vec![
                    r.month.label().to_string(),
                    format!("{:.2}", r.total_income),
                    format!("{:.2}", r.total_expense),
                    format!("{:.2}", r.balance),
                ]
            })
            .collect();
        println!("Report {}", report.year);
        println!(
            "{}",
            pretty_table(&["Month", "Income", "Expense", "Balance"], rows)
        );
        for f in &report.failures {
            println!("warning: {}", f);
        }
    }

    async fn dashboard(&self) {
        let d = self.reports.dashboard(&current_year()).await;
        println!(
            "{}",
            pretty_table(
                &["Year", "Income", "Expenses", "Balance"],
                vec![vec![
                    d.year.clone(),
                    format_amount(d.total_income),
                    format_amount(d.total_expense),
                    format_amount(d.balance),
                ]],
            )
        );
        let top = |items: &[(String, rust_decimal::Decimal)]| -> Vec<Vec<String>> {
            items
                .iter()
                .map(|(name, v)| vec![name.clone(), format_amount(*v)])
                .collect()
        };
        println!("{}", pretty_table(&["Top income", "Total"], top(&d.top_income)));
        println!("{}", pretty_table(&["Top expenses", "Total"], top(&d.top_expense)));
        for f in &d.failures {
            println!("warning: {}", f);
        }
    }

    async fn notifications(&self) -> Result<()> {
        let items = self.ctx.sink.notifications(self.ctx.session.id).await?;
        let rows = items
            .into_iter()
            .map(|n| {
                vec![
                    n.created_at.format("%Y-%m-%d %H:%M").to_string(),
                    if n.is_read { "" } else { "*" }.to_string(),
                    n.message,
                ]
            })
            .collect();
        println!("{}", pretty_table(&["When", "New", "Message"], rows));
        Ok(())
    }

    fn page_size(&mut self, raw: &str) -> Result<()> {
        let size: usize = raw
            .parse()
            .with_context(|| format!("Invalid page size '{}'", raw))?;
        if !self.settings.set_page_size(size) {
            return Err(anyhow!("page size must be one of {:?}", PAGE_SIZE_OPTIONS));
        }
        self.settings.save(&self.settings_path)?;
        println!("Page size saved; it applies the next time a view is opened.");
        Ok(())
    }
}

async fn settle(handle: tokio::task::JoinHandle<()>) -> Result<()> {
    handle.await.context("Refresh task failed")
}

async fn drive<E: Entity>(ctl: &mut ListController<E>, cmd: &str, rest: &str) -> Result<()> {
    let handle = match cmd {
        "next" => ctl.next_page(),
        "prev" => ctl.prev_page(),
        "page" => {
            let page: usize = rest
                .parse()
                .with_context(|| format!("Invalid page '{}'", rest))?;
            Some(ctl.go_to_page(page)?)
        }
        "search" => Some(ctl.set_search(rest)),
        "clear" => Some(ctl.set_search("")),
        "refresh" => Some(ctl.refresh()),
        other => return Err(anyhow!("unknown command '{}', try 'help'", other)),
    };
    match handle {
        Some(h) => settle(h).await,
        None => {
            println!("No more pages that way.");
            Ok(())
        }
    }
}

fn pick_row<E: Entity>(ctl: &ListController<E>, raw: &str) -> Result<E> {
    let idx: usize = raw
        .trim()
        .parse()
        .with_context(|| format!("Invalid row '{}'", raw))?;
    let view = ctl.snapshot();
    idx.checked_sub(1)
        .and_then(|i| view.rows.get(i))
        .cloned()
        .ok_or_else(|| anyhow!("no row {} on this page", idx))
}

/// `category,month,year,amount`; blank or missing fields keep `base`.
fn record_form(raw: &str, base: RecordForm) -> RecordForm {
    let mut parts = raw.split(',').map(str::trim);
    let mut next = |current: String| match parts.next() {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => current,
    };
    RecordForm {
        category: next(base.category),
        month: next(base.month),
        year: next(base.year),
        amount: next(base.amount),
    }
}

fn footer<E>(view: &View<E>) {
    if view.is_empty() {
        println!("No results.");
    }
    println!("{}  ({} total)", view.page_label(), view.total_count);
    if let Some(notice) = &view.failure {
        println!("warning: {}", notice);
    }
}

fn render_records(title: &str, view: &View<Record>) {
    let rows = view
        .rows
        .iter()
        .enumerate()
        .map(|(i, r)| {
            vec![
                (i + 1).to_string(),
                r.category.clone(),
                r.month.label().to_string(),
                r.year.clone(),
                format!("{:.2}", r.amount),
            ]
        })
        .collect();
    match view.query.as_str() {
        "" => println!("{}", title),
        q => println!("{} matching '{}'", title, q),
    }
    println!(
        "{}",
        pretty_table(&["#", "Category", "Month", "Year", "Amount"], rows)
    );
    footer(view);
}

fn render_categories(title: &str, view: &View<Category>) {
    let rows = view
        .rows
        .iter()
        .enumerate()
        .map(|(i, c)| vec![(i + 1).to_string(), c.name.clone()])
        .collect();
    match view.query.as_str() {
        "" => println!("{}", title),
        q => println!("{} matching '{}'", title, q),
    }
    println!("{}", pretty_table(&["#", "Name"], rows));
    footer(view);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_form_keeps_blank_fields() {
        let base = RecordForm {
            category: "Salary".into(),
            month: "Jan".into(),
            year: "2024".into(),
            amount: "10".into(),
        };
        let f = record_form(",Feb,, 12.5", base);
        assert_eq!(f.category, "Salary");
        assert_eq!(f.month, "Feb");
        assert_eq!(f.year, "2024");
        assert_eq!(f.amount, "12.5");
    }

    #[test]
    fn view_names_parse() {
        assert_eq!(ViewKind::parse("expenses"), Some(ViewKind::Expenses));
        assert_eq!(ViewKind::parse("income-categories"), Some(ViewKind::IncomeCategories));
        assert_eq!(ViewKind::parse("nope"), None);
    }
}
