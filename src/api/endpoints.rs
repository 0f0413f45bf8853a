use serde_json::Value;

use super::models::{
    AuthResponse, DashboardStats, DonationDto, LoginRequest, OngRegistrationRequest, Page, ProjectDto,
    RegisterRequest, UserProfileDto, VolunteerDto,
};
use super::{ApiClient, RequestOptions};
use crate::error::RequestResult;

pub const DEFAULT_PAGE: u32 = 0;
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Tag value the volunteer filter uses for "no filter".
pub const ALL_TAGS: &str = "all";

fn enc(segment: &str) -> String { urlencoding::encode(segment).into_owned() }

fn paged(path: &str, page: u32, size: u32) -> String { format!("{}?page={}&size={}", path, page, size) }

impl ApiClient {
    // --- auth ---

    pub async fn login(&self, data: &LoginRequest) -> RequestResult<AuthResponse> {
        self.request("/auth/login", RequestOptions::post(data)?).await
    }

    pub async fn register(&self, data: &RegisterRequest) -> RequestResult<AuthResponse> {
        self.request("/auth/register", RequestOptions::post(data)?).await
    }

    /// Organization sign-up. Does not authenticate the caller.
    pub async fn register_ong(&self, data: &OngRegistrationRequest) -> RequestResult<Value> {
        self.request("/auth/register/ong", RequestOptions::post(data)?).await
    }

    // --- donations ---

    pub async fn create_donation(&self, data: &DonationDto) -> RequestResult<DonationDto> {
        self.request("/donations", RequestOptions::post(data)?).await
    }

    pub async fn donations_by_group(&self, group_id: i64, page: u32, size: u32) -> RequestResult<Page<DonationDto>> {
        self.request(&paged(&format!("/donations/group/{}", group_id), page, size), RequestOptions::get()).await
    }

    pub async fn total_donations(&self, group_id: i64) -> RequestResult<f64> {
        self.request(&format!("/donations/group/{}/total", group_id), RequestOptions::get()).await
    }

    // --- volunteers ---

    pub async fn create_volunteer(&self, data: &VolunteerDto) -> RequestResult<VolunteerDto> {
        self.request("/volunteers", RequestOptions::post(data)?).await
    }

    pub async fn volunteers_by_group(&self, group_id: i64, page: u32, size: u32) -> RequestResult<Page<VolunteerDto>> {
        self.request(&paged(&format!("/volunteers/group/{}", group_id), page, size), RequestOptions::get()).await
    }

    pub async fn add_volunteer_hours(&self, guid: &str, hours: f64) -> RequestResult<VolunteerDto> {
        let endpoint = format!("/volunteers/{}/hours?hours={}", enc(guid), hours);
        self.request(&endpoint, RequestOptions::patch()).await
    }

    // --- projects ---

    pub async fn create_project(&self, data: &ProjectDto) -> RequestResult<ProjectDto> {
        self.request("/projects", RequestOptions::post(data)?).await
    }

    pub async fn projects_by_group(&self, group_id: i64, page: u32, size: u32) -> RequestResult<Page<ProjectDto>> {
        self.request(&paged(&format!("/projects/group/{}", group_id), page, size), RequestOptions::get()).await
    }

    pub async fn project(&self, guid: &str) -> RequestResult<ProjectDto> {
        self.request(&format!("/projects/{}", enc(guid)), RequestOptions::get()).await
    }

    // --- dashboards ---

    pub async fn dashboard_stats(&self, group_id: i64) -> RequestResult<DashboardStats> {
        self.request(&format!("/dashboard/stats/{}", group_id), RequestOptions::get()).await
    }

    pub async fn volunteer_dashboard(&self, volunteer_guid: &str) -> RequestResult<Value> {
        self.request(&format!("/volunteer-dashboard/{}", enc(volunteer_guid)), RequestOptions::get()).await
    }

    pub async fn volunteer_history(&self, volunteer_guid: &str) -> RequestResult<Vec<Value>> {
        self.request(&format!("/history/volunteer/{}", enc(volunteer_guid)), RequestOptions::get()).await
    }

    pub async fn volunteer_certificates(&self, volunteer_guid: &str) -> RequestResult<Vec<Value>> {
        self.request(&format!("/certificates/volunteer/{}", enc(volunteer_guid)), RequestOptions::get()).await
    }

    // --- profiles ---

    pub async fn user_profile(&self, user_guid: &str) -> RequestResult<UserProfileDto> {
        self.request(&format!("/profiles/{}", enc(user_guid)), RequestOptions::get()).await
    }

    /// Update when the profile already exists on the server, create otherwise.
    pub async fn save_profile(&self, profile: &UserProfileDto) -> RequestResult<UserProfileDto> {
        if profile.is_persisted() {
            let endpoint = format!("/profiles/{}", enc(&profile.user_guid));
            self.request(&endpoint, RequestOptions::put(profile)?).await
        } else {
            self.request("/profiles", RequestOptions::post(profile)?).await
        }
    }

    pub async fn search_profiles_by_tag(&self, tag: &str) -> RequestResult<Vec<UserProfileDto>> {
        self.request(&format!("/profiles/search?tag={}", enc(tag)), RequestOptions::get()).await
    }

    pub async fn all_tags(&self) -> RequestResult<Vec<String>> {
        self.request("/profiles/tags", RequestOptions::get()).await
    }

    /// Volunteer profiles, optionally filtered by tag; `"all"` means no filter.
    pub async fn volunteers(&self, tag: Option<&str>, page: u32, size: u32) -> RequestResult<Page<UserProfileDto>> {
        self.request(&volunteers_query(tag, page, size), RequestOptions::get()).await
    }
}

pub(crate) fn volunteers_query(tag: Option<&str>, page: u32, size: u32) -> String {
    let mut query = Vec::with_capacity(3);
    if let Some(t) = tag.filter(|t| !t.is_empty() && *t != ALL_TAGS) {
        query.push(format!("tag={}", enc(t)));
    }
    query.push(format!("page={}", page));
    query.push(format!("size={}", size));
    format!("/profiles/volunteers?{}", query.join("&"))
}
