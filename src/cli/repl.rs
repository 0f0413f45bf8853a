//!
//! Interactive session
//! -------------------
//! Executes parsed commands against the session, the API client and the
//! volunteer directory. Opening a page runs that page's guard exactly like a
//! browser navigation would; a session change re-checks the current page.

use std::io::Write;
use std::sync::Arc;

use anyhow::{bail, Result};
use serde::Serialize;
use tracing::debug;

use super::command::{parse_command, Command, TagEdit, HELP};
use super::render_result;
use crate::api::models::UserProfileDto;
use crate::api::{ApiClient, DEFAULT_PAGE_SIZE};
use crate::directory::VolunteerDirectory;
use crate::identity::{policies_for, AccessGuard, GuardState, Identity, Navigator, RecordingNavigator, RouteTable, Session, HOME_PATH};
use crate::validation::{add_tag, remove_tag, LoginForm};

pub const VOLUNTEERS_PATH: &str = "/ong/volunteers";
const PROFILE_PATH: &str = "/volunteer-profile";
const HISTORY_PATH: &str = "/volunteer-history";
const CERTIFICATES_PATH: &str = "/volunteer-certificates";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Repl {
    session: Arc<Session>,
    api: ApiClient,
    routes: RouteTable,
    directory: VolunteerDirectory,
    location: String,
    // Guard of the current page, if it is protected.
    guard: Option<AccessGuard>,
}

impl Repl {
    pub fn new(session: Arc<Session>, api: ApiClient, page_size: u32) -> Self {
        Self {
            session,
            api,
            routes: RouteTable::default(),
            directory: VolunteerDirectory::new(page_size),
            location: HOME_PATH.to_string(),
            guard: None,
        }
    }

    pub fn location(&self) -> &str { &self.location }

    pub fn directory(&self) -> &VolunteerDirectory { &self.directory }

    pub fn prompt(&self) -> String {
        match self.session.current_identity() {
            Some(id) => format!("{} {}> ", id.label(), self.location),
            None => format!("{}> ", self.location),
        }
    }

    /// Parse and execute one input line, reporting failures on `out`.
    pub async fn run_line<W: Write>(&mut self, line: &str, out: &mut W) -> std::io::Result<Flow> {
        let cmd = match parse_command(line) {
            Ok(Some(cmd)) => {
                // arguments may hold credentials
                debug!(command = line.split_whitespace().next().unwrap_or_default(), "repl command");
                cmd
            }
            Ok(None) => return Ok(Flow::Continue),
            Err(e) => {
                writeln!(out, "{}", e)?;
                return Ok(Flow::Continue);
            }
        };
        match self.execute(cmd, out).await {
            Ok(flow) => Ok(flow),
            Err(e) => {
                writeln!(out, "error: {:#}", e)?;
                Ok(Flow::Continue)
            }
        }
    }

    pub async fn execute<W: Write>(&mut self, cmd: Command, out: &mut W) -> Result<Flow> {
        match cmd {
            Command::Login { email, password } => {
                let req = LoginForm { email, password }.validate()?;
                let id = self.session.login(&self.api, &req).await?;
                writeln!(out, "signed in as {} ({})", id.label(), id.role)?;
                self.recheck(out)?;
            }
            Command::Register(form) => {
                let req = form.validate()?;
                let id = self.session.register(&self.api, &req).await?;
                writeln!(out, "account created; signed in as {} ({})", id.label(), id.role)?;
                self.recheck(out)?;
            }
            Command::RegisterOng(form) => {
                let req = form.validate()?;
                self.api.register_ong(&req).await?;
                writeln!(out, "organization '{}' registered; sign in as {}", req.organization_name, req.admin_email)?;
            }
            Command::Logout => {
                if self.session.is_authenticated() {
                    self.session.logout();
                    writeln!(out, "signed out")?;
                    self.recheck(out)?;
                } else {
                    writeln!(out, "not signed in")?;
                }
            }
            Command::WhoAmI => match self.session.current_identity() {
                Some(id) => writeln!(out, "{} <{}> role={} id={}", id.label(), id.email, id.role, id.id)?,
                None => writeln!(out, "not signed in")?,
            },
            Command::Policies => {
                let id = self.signed_in()?;
                let names: Vec<String> = policies_for(&id.role).iter().map(ToString::to_string).collect();
                if names.is_empty() {
                    writeln!(out, "role {} grants no policies", id.role)?;
                } else {
                    writeln!(out, "{}", names.join("\n"))?;
                }
            }
            Command::Open(path) => {
                self.open(&path, out).await?;
            }
            Command::Volunteers { tag, page } => {
                if self.open(VOLUNTEERS_PATH, out).await? {
                    if let Some(tag) = tag.as_deref() {
                        self.directory.select_tag(Some(tag));
                    }
                    if let Some(page) = page {
                        self.directory.go_to_page(page);
                    }
                    self.show_directory(out).await?;
                }
            }
            Command::NextPage => self.turn_page(true, out).await?,
            Command::PreviousPage => self.turn_page(false, out).await?,
            Command::Tags => {
                let tags = self.directory.refresh_tags(&self.api).await?;
                if tags.is_empty() {
                    writeln!(out, "no tags yet")?;
                } else {
                    writeln!(out, "{}", tags.join(", "))?;
                }
            }
            Command::Profile => {
                if self.open(PROFILE_PATH, out).await? {
                    let id = self.signed_in()?;
                    let profile = self.load_profile(&id).await?;
                    if !profile.is_persisted() {
                        writeln!(out, "no profile saved yet")?;
                    }
                    print_value(out, &profile)?;
                }
            }
            Command::ProfileTag(edit) => {
                if self.open(PROFILE_PATH, out).await? {
                    let id = self.signed_in()?;
                    let mut profile = self.load_profile(&id).await?;
                    let changed = match &edit {
                        TagEdit::Add(tag) => add_tag(&mut profile.tags, tag),
                        TagEdit::Remove(tag) => remove_tag(&mut profile.tags, tag),
                    };
                    if changed {
                        let saved = self.api.save_profile(&profile).await?;
                        writeln!(out, "tags: {}", saved.tags.join(", "))?;
                    } else {
                        writeln!(out, "tags unchanged")?;
                    }
                }
            }
            Command::History => {
                if self.open(HISTORY_PATH, out).await? {
                    let id = self.signed_in()?;
                    let items = self.api.volunteer_history(&id.id).await?;
                    print_value(out, &items)?;
                }
            }
            Command::Certificates => {
                if self.open(CERTIFICATES_PATH, out).await? {
                    let id = self.signed_in()?;
                    let items = self.api.volunteer_certificates(&id.id).await?;
                    print_value(out, &items)?;
                }
            }
            Command::Stats(group) => {
                let stats = self.api.dashboard_stats(group).await?;
                print_value(out, &stats)?;
            }
            Command::Projects { group, page } => {
                let projects = self.api.projects_by_group(group, page, DEFAULT_PAGE_SIZE).await?;
                print_value(out, &projects)?;
            }
            Command::Donations { group, page } => {
                let donations = self.api.donations_by_group(group, page, DEFAULT_PAGE_SIZE).await?;
                print_value(out, &donations)?;
                let total = self.api.total_donations(group).await?;
                writeln!(out, "total donated: {:.2}", total)?;
            }
            Command::Help => writeln!(out, "{}", HELP)?,
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn signed_in(&self) -> Result<Identity> {
        match self.session.current_identity() {
            Some(id) => Ok(id),
            None => bail!("not signed in; use 'login' first"),
        }
    }

    /// Navigate to `path`. Returns whether the page is now shown; a guarded
    /// page the user may not see redirects instead.
    pub async fn open<W: Write>(&mut self, path: &str, out: &mut W) -> Result<bool> {
        let Some(route) = self.routes.resolve(path).cloned() else {
            writeln!(out, "page not found: {}", path)?;
            return Ok(false);
        };
        let Some(mut guard) = route.guard() else {
            self.show_page(route.path, None);
            writeln!(out, "{} ({})", route.title, route.path)?;
            return Ok(true);
        };

        let mut rx = self.session.subscribe();
        let state = guard.settle(&mut rx).await;
        let mut nav = RecordingNavigator::default();
        if guard.flush(&mut nav) {
            let reason = match state {
                GuardState::RedirectLogin => "sign in required",
                _ => "not available for your role",
            };
            for target in nav.visited {
                writeln!(out, "{}: {}; redirected to {}", route.path, reason, target)?;
                self.show_page(&target, None);
            }
            return Ok(false);
        }
        match state {
            GuardState::Authorized => {
                if self.location != route.path {
                    writeln!(out, "{} ({})", route.title, route.path)?;
                }
                self.show_page(route.path, Some(guard));
                Ok(true)
            }
            _ => {
                writeln!(out, "{}: session is still loading", route.path)?;
                Ok(false)
            }
        }
    }

    fn show_page(&mut self, path: &str, guard: Option<AccessGuard>) {
        self.location = path.to_string();
        self.guard = guard;
    }

    // Re-run the current page's guard after the session changed.
    fn recheck<W: Write>(&mut self, out: &mut W) -> Result<()> {
        let view = self.session.snapshot();
        let mut nav = PageRedirect::default();
        if let Some(guard) = self.guard.as_mut() {
            guard.observe(&view);
            guard.flush(&mut nav);
        }
        if let Some(target) = nav.0 {
            writeln!(out, "{} is no longer available; redirected to {}", self.location, target)?;
            self.show_page(&target, None);
        }
        Ok(())
    }

    async fn turn_page<W: Write>(&self, forward: bool, out: &mut W) -> Result<()> {
        if self.location != VOLUNTEERS_PATH {
            bail!("no paged list open; use 'volunteers' first");
        }
        let before = self.directory.filter().page;
        let after = if forward { self.directory.next_page().page } else { self.directory.previous_page().page };
        if before == after {
            writeln!(out, "already on the {} page", if forward { "last" } else { "first" })?;
            return Ok(());
        }
        self.show_directory(out).await
    }

    async fn show_directory<W: Write>(&self, out: &mut W) -> Result<()> {
        self.directory.refresh(&self.api).await;
        let filter = self.directory.filter();
        let snap = self.directory.snapshot();
        writeln!(out, "tag: {}", filter.tag.as_deref().unwrap_or("all"))?;
        if let Some(err) = snap.error.as_ref() {
            writeln!(out, "error: {}", err)?;
        }
        match snap.data.as_ref() {
            Some(page) if page.is_empty() => writeln!(out, "no volunteers found")?,
            Some(page) => print_value(out, page)?,
            None => {}
        }
        Ok(())
    }

    async fn load_profile(&self, id: &Identity) -> Result<UserProfileDto> {
        match self.api.user_profile(&id.id).await {
            Ok(p) => Ok(p),
            Err(e) if e.is_not_found() => Ok(UserProfileDto::new_for(&id.id)),
            Err(e) => Err(e.into()),
        }
    }
}

// Last redirect requested by a guard.
#[derive(Default)]
struct PageRedirect(Option<String>);

impl Navigator for PageRedirect {
    fn navigate(&mut self, path: &str) {
        self.0 = Some(path.to_string());
    }
}

fn print_value<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<()> {
    let v = serde_json::to_value(value)?;
    writeln!(out, "{}", render_result(&v))?;
    Ok(())
}
