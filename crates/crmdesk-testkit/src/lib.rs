// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use crmdesk_app::{
    Activity, ActivityId, Application, ApplicationId, Contact, ContactId, DataSnapshot,
    Department, DepartmentId, Incident, IncidentId, Integration, IntegrationId, TagCategory,
    TagCategoryDetail, TagCategoryId, TagId, TagValue, join_multi_value,
};
use serde_json::Value;
use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use time::{Date, Duration, Month};
use tiny_http::{Header, Response, Server};

const DEPARTMENT_ADJECTIVES: [&str; 10] = [
    "Northern", "Coastal", "National", "Regional", "Public", "Federal", "Rural", "Urban",
    "Digital", "Civic",
];

const DEPARTMENT_NOUNS: [&str; 10] = [
    "Health",
    "Revenue",
    "Transport",
    "Fisheries",
    "Parks",
    "Housing",
    "Employment",
    "Immigration",
    "Heritage",
    "Justice",
];

const APP_TOPICS: [&str; 10] = [
    "Benefits", "License", "Permit", "Tax", "Reservation", "Registry", "Grant", "Travel",
    "Payroll", "Claims",
];

const APP_SUFFIXES: [&str; 5] = ["Portal", "Tracker", "Service", "System", "Hub"];

const FIRST_NAMES: [&str; 12] = [
    "Sarah", "Michael", "Jennifer", "David", "Lisa", "Robert", "Amanda", "James", "Emily",
    "Chris", "Priya", "Omar",
];

const LAST_NAMES: [&str; 12] = [
    "Chen", "Brown", "Williams", "Kim", "Park", "Thompson", "Lee", "Wilson", "Davis", "Martin",
    "Singh", "Haddad",
];

const SUMMARY_WORDS: [&str; 20] = [
    "review",
    "integration",
    "kickoff",
    "testing",
    "timeline",
    "security",
    "assessment",
    "followup",
    "onboarding",
    "credential",
    "migration",
    "outage",
    "workshop",
    "planning",
    "rollout",
    "sign-in",
    "escalation",
    "requirements",
    "certificate",
    "renewal",
];

const TIERS: [&str; 2] = ["critical", "standard"];
const DEPARTMENT_STATUSES: [&str; 2] = ["active", "inactive"];
const OWNER_TEAMS: [&str; 3] = [
    "Client Success Alpha",
    "Client Success Beta",
    "Client Success Gamma",
];
const ENVIRONMENTS: [&str; 2] = ["prod", "test"];
const AUTH_TYPES: [&str; 3] = ["GC Key", "Interact Sign In", "GCCF Consolidator"];
const APPLICATION_STATUSES: [&str; 3] = ["live", "integrating", "deprecated"];
const STAGES: [&str; 5] = ["intake", "design", "implementation", "testing", "production"];
const INTEGRATION_STATUSES: [&str; 3] = ["on_track", "blocked", "delayed"];
const RISK_LEVELS: [&str; 3] = ["low", "medium", "high"];
const ROLES: [&str; 3] = ["business", "technical", "security"];
const ACTIVITY_TYPES: [&str; 4] = ["meeting", "email", "workshop", "incident"];
const SEVERITIES: [&str; 4] = ["low", "medium", "high", "critical"];
const INCIDENT_STATUSES: [&str; 4] = ["open", "investigating", "resolved", "closed"];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Seeded generator of plausible organization data. The same seed always
/// yields the same records.
#[derive(Debug, Clone)]
pub struct OrgFaker {
    rng: DeterministicRng,
    seed: u64,
}

impl OrgFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            seed: normalized,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn department(&mut self, id: i64) -> Department {
        let adjective = self.pick(&DEPARTMENT_ADJECTIVES);
        let noun = self.pick(&DEPARTMENT_NOUNS);
        Department {
            department_id: DepartmentId::new(id),
            name: format!("{adjective} {noun} Agency"),
            acronym: format!("{}{}A", initial(adjective), initial(noun)),
            tier: self.pick(&TIERS).to_owned(),
            status: self.pick(&DEPARTMENT_STATUSES).to_owned(),
            owner_team: self.pick(&OWNER_TEAMS).to_owned(),
            app_count: Some(0),
            ..Department::default()
        }
    }

    pub fn application(&mut self, department: &Department, id: i64) -> Application {
        let mut auth = vec![self.pick(&AUTH_TYPES).to_owned()];
        if self.rng.bool() {
            let second = self.pick(&AUTH_TYPES).to_owned();
            if !auth.contains(&second) {
                auth.push(second);
            }
        }
        Application {
            app_id: ApplicationId::new(id),
            department_id: department.department_id,
            department_name: department.name.clone(),
            app_name: format!(
                "{} {}",
                self.pick(&APP_TOPICS),
                self.pick(&APP_SUFFIXES)
            ),
            environment: self.pick(&ENVIRONMENTS).to_owned(),
            auth_type: join_multi_value(&auth),
            status: self.pick(&APPLICATION_STATUSES).to_owned(),
            go_live_date: Some(self.date_string(2023, 2025)),
        }
    }

    pub fn integration(&mut self, application: &Application, id: i64) -> Integration {
        Integration {
            integration_id: IntegrationId::new(id),
            app_id: application.app_id,
            app_name: application.app_name.clone(),
            department_id: Some(application.department_id),
            department_name: application.department_name.clone(),
            stage: self.pick(&STAGES).to_owned(),
            status: self.pick(&INTEGRATION_STATUSES).to_owned(),
            risk_level: self.pick(&RISK_LEVELS).to_owned(),
            notes: self.sentence(3, 8),
            last_updated: Some(format!("{}T09:30:00", self.date_string(2025, 2025))),
        }
    }

    pub fn contact(&mut self, department: &Department, id: i64) -> Contact {
        let first = self.pick(&FIRST_NAMES);
        let last = self.pick(&LAST_NAMES);
        Contact {
            contact_id: ContactId::new(id),
            department_id: department.department_id,
            department_name: department.name.clone(),
            name: format!("{first} {last}"),
            role: self.pick(&ROLES).to_owned(),
            email: format!(
                "{}.{}@{}.gc.ca",
                first.to_lowercase(),
                last.to_lowercase(),
                department.acronym.to_lowercase()
            ),
            phone: format!("613-555-{:04}", self.rng.int_n(10_000)),
            active_flag: self.rng.int_n(5) != 0,
        }
    }

    pub fn activity(
        &mut self,
        department: &Department,
        application: Option<&Application>,
        id: i64,
    ) -> Activity {
        Activity {
            activity_id: ActivityId::new(id),
            department_id: department.department_id,
            department_name: department.name.clone(),
            app_id: application.map(|app| app.app_id),
            app_name: application
                .map(|app| app.app_name.clone())
                .unwrap_or_default(),
            activity_type: self.pick(&ACTIVITY_TYPES).to_owned(),
            date: Some(self.date_string(2025, 2025)),
            summary: self.sentence(4, 9),
            next_action: self.sentence(2, 5),
            owner: self.pick(&FIRST_NAMES).to_owned(),
        }
    }

    pub fn incident(&mut self, application: &Application, id: i64) -> Incident {
        let status = self.pick(&INCIDENT_STATUSES).to_owned();
        let created = self.date_string(2025, 2025);
        let resolved_at = matches!(status.as_str(), "resolved" | "closed")
            .then(|| format!("{created}T17:00:00"));
        Incident {
            incident_id: IncidentId::new(id),
            app_id: application.app_id,
            app_name: application.app_name.clone(),
            department_name: application.department_name.clone(),
            severity: self.pick(&SEVERITIES).to_owned(),
            status,
            description: self.sentence(5, 10),
            root_cause: if resolved_at.is_some() {
                self.sentence(3, 6)
            } else {
                String::new()
            },
            created_at: Some(format!("{created}T08:15:00")),
            resolved_at,
        }
    }

    /// A full snapshot with `departments` departments, one to three
    /// applications each, and contacts, activities and incidents around them.
    pub fn snapshot(&mut self, departments: usize) -> DataSnapshot {
        let mut snapshot = DataSnapshot {
            tag_categories: seeded_tag_categories(),
            ..DataSnapshot::default()
        };
        let mut next_id = 1_i64;
        let mut take_id = || {
            let id = next_id;
            next_id += 1;
            id
        };

        for _ in 0..departments {
            let mut department = self.department(take_id());
            let app_count = 1 + self.rng.int_n(3);
            for _ in 0..app_count {
                let application = self.application(&department, take_id());
                snapshot
                    .integrations
                    .push(self.integration(&application, take_id()));
                if self.rng.bool() {
                    snapshot
                        .incidents
                        .push(self.incident(&application, take_id()));
                }
                snapshot.applications.push(application);
            }
            department.app_count = Some(app_count as i64);

            for _ in 0..1 + self.rng.int_n(2) {
                snapshot.contacts.push(self.contact(&department, take_id()));
            }
            let linked = snapshot
                .applications
                .iter()
                .rev()
                .find(|app| app.department_id == department.department_id)
                .cloned();
            let with_app = if self.rng.bool() { linked.as_ref() } else { None };
            snapshot
                .activities
                .push(self.activity(&department, with_app, take_id()));
            snapshot.departments.push(department);
        }
        snapshot
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn date_string(&mut self, from_year: i32, to_year: i32) -> String {
        let years = (to_year - from_year).max(0) as usize + 1;
        let year = from_year + self.rng.int_n(years) as i32;
        let start = Date::from_calendar_date(year, Month::January, 1).unwrap_or(Date::MIN);
        let date = start + Duration::days(self.rng.int_n(365) as i64);
        crmdesk_app::format_calendar_date(date)
    }

    fn sentence(&mut self, min_words: usize, max_words: usize) -> String {
        let count = min_words + self.rng.int_n(max_words.saturating_sub(min_words) + 1);
        let words = (0..count)
            .map(|_| self.pick(&SUMMARY_WORDS))
            .collect::<Vec<_>>();
        let mut sentence = words.join(" ");
        if let Some(first) = sentence.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        sentence.push('.');
        sentence
    }
}

fn initial(word: &str) -> char {
    word.chars().next().unwrap_or('X')
}

fn seeded_tag(
    category_id: i64,
    category: &str,
    id: i64,
    (value, label, color): (&str, &str, &str),
    sort_order: i64,
) -> TagValue {
    TagValue {
        tag_id: TagId::new(id),
        category_id: TagCategoryId::new(category_id),
        category_name: category.to_owned(),
        value: value.to_owned(),
        label: label.to_owned(),
        color: color.to_owned(),
        is_active: true,
        sort_order,
    }
}

/// The default tag categories a fresh backend ships with.
pub fn seeded_tag_categories() -> Vec<TagCategory> {
    type Seed = (
        &'static str,
        &'static str,
        &'static str,
        &'static str,
        &'static [(&'static str, &'static str, &'static str)],
    );
    const SEEDS: [Seed; 9] = [
        (
            "department_tier",
            "Department Tier",
            "department",
            "tier",
            &[("critical", "Critical", "#E74C3C"), ("standard", "Standard", "#3498DB")],
        ),
        (
            "department_status",
            "Department Status",
            "department",
            "status",
            &[("active", "Active", "#27AE60"), ("inactive", "Inactive", "#95A5A6")],
        ),
        (
            "department_owner_team",
            "Owner Team",
            "department",
            "owner_team",
            &[
                ("Client Success Alpha", "Client Success Alpha", "#9B59B6"),
                ("Client Success Beta", "Client Success Beta", "#3498DB"),
                ("Client Success Gamma", "Client Success Gamma", "#1ABC9C"),
            ],
        ),
        (
            "application_environment",
            "Application Environment",
            "application",
            "environment",
            &[("prod", "Production", "#27AE60"), ("test", "Test", "#F39C12")],
        ),
        (
            "application_auth_type",
            "Authentication Type",
            "application",
            "auth_type",
            &[
                ("GC Key", "GC Key", "#3498DB"),
                ("Interact Sign In", "Interact Sign In", "#9B59B6"),
                ("GCCF Consolidator", "GCCF Consolidator", "#95A5A6"),
            ],
        ),
        (
            "application_status",
            "Application Status",
            "application",
            "status",
            &[
                ("live", "Live", "#27AE60"),
                ("integrating", "Integrating", "#F39C12"),
                ("deprecated", "Deprecated", "#95A5A6"),
            ],
        ),
        (
            "integration_stage",
            "Integration Stage",
            "integration",
            "stage",
            &[
                ("intake", "Intake", "#3498DB"),
                ("design", "Design", "#9B59B6"),
                ("implementation", "Implementation", "#F39C12"),
                ("testing", "Testing", "#E67E22"),
                ("production", "Production", "#27AE60"),
            ],
        ),
        (
            "contact_role",
            "Contact Role",
            "contact",
            "role",
            &[
                ("business", "Business", "#3498DB"),
                ("technical", "Technical", "#9B59B6"),
                ("security", "Security", "#E74C3C"),
            ],
        ),
        (
            "activity_type",
            "Activity Type",
            "activity",
            "type",
            &[
                ("meeting", "Meeting", "#3498DB"),
                ("email", "Email", "#1ABC9C"),
                ("workshop", "Workshop", "#9B59B6"),
                ("incident", "Incident", "#E74C3C"),
            ],
        ),
    ];

    let mut next_tag_id = 1_i64;
    SEEDS
        .iter()
        .enumerate()
        .map(|(index, (name, display_name, entity_type, field_name, values))| {
            let category_id = index as i64 + 1;
            let tags = values
                .iter()
                .enumerate()
                .map(|(position, seed)| {
                    let id = next_tag_id;
                    next_tag_id += 1;
                    seeded_tag(category_id, name, id, *seed, position as i64 + 1)
                })
                .collect::<Vec<_>>();
            TagCategory {
                category_id: TagCategoryId::new(category_id),
                name: (*name).to_owned(),
                display_name: (*display_name).to_owned(),
                description: String::new(),
                entity_type: (*entity_type).to_owned(),
                field_name: (*field_name).to_owned(),
                tag_count: Some(tags.len() as i64),
                tags,
            }
        })
        .collect()
}

/// Small hand-written dataset with stable ids and names for assertions.
pub fn sample_snapshot() -> DataSnapshot {
    let health = Department {
        department_id: DepartmentId::new(1),
        name: "Health Canada".to_owned(),
        acronym: "DOH".to_owned(),
        tier: "critical".to_owned(),
        status: "active".to_owned(),
        owner_team: "Client Success Alpha".to_owned(),
        app_count: Some(2),
        ..Department::default()
    };
    let revenue = Department {
        department_id: DepartmentId::new(2),
        name: "Canada Revenue Agency".to_owned(),
        acronym: "CRA".to_owned(),
        tier: "critical".to_owned(),
        status: "active".to_owned(),
        owner_team: "Client Success Beta".to_owned(),
        app_count: Some(1),
        ..Department::default()
    };
    let transport = Department {
        department_id: DepartmentId::new(3),
        name: "Transport Canada".to_owned(),
        acronym: "TC".to_owned(),
        tier: "standard".to_owned(),
        status: "inactive".to_owned(),
        owner_team: "Client Success Gamma".to_owned(),
        app_count: Some(0),
        ..Department::default()
    };

    let app = |id: i64, department: &Department, name: &str, auth: &str, status: &str| {
        Application {
            app_id: ApplicationId::new(id),
            department_id: department.department_id,
            department_name: department.name.clone(),
            app_name: name.to_owned(),
            environment: "prod".to_owned(),
            auth_type: auth.to_owned(),
            status: status.to_owned(),
            go_live_date: Some("2024-03-15".to_owned()),
        }
    };
    let portal = app(10, &health, "Health Portal", "GC Key", "live");
    let tracker = app(
        11,
        &health,
        "Vaccine Tracker",
        "GC Key,Interact Sign In",
        "integrating",
    );
    let tax = app(12, &revenue, "Business Tax Portal", "Interact Sign In", "live");

    let integration = |id: i64, app: &Application, stage: &str, status: &str, risk: &str| {
        Integration {
            integration_id: IntegrationId::new(id),
            app_id: app.app_id,
            app_name: app.app_name.clone(),
            department_id: Some(app.department_id),
            department_name: app.department_name.clone(),
            stage: stage.to_owned(),
            status: status.to_owned(),
            risk_level: risk.to_owned(),
            notes: String::new(),
            last_updated: Some("2025-01-10T12:00:00".to_owned()),
        }
    };

    DataSnapshot {
        integrations: vec![
            integration(20, &portal, "production", "on_track", "low"),
            integration(21, &tracker, "testing", "delayed", "medium"),
            integration(22, &tax, "implementation", "blocked", "high"),
        ],
        contacts: vec![
            Contact {
                contact_id: ContactId::new(30),
                department_id: health.department_id,
                department_name: health.name.clone(),
                name: "Sarah Chen".to_owned(),
                role: "business".to_owned(),
                email: "sarah.chen@hc.gc.ca".to_owned(),
                phone: "613-555-0101".to_owned(),
                active_flag: true,
            },
            Contact {
                contact_id: ContactId::new(31),
                department_id: revenue.department_id,
                department_name: revenue.name.clone(),
                name: "Robert Thompson".to_owned(),
                role: "security".to_owned(),
                email: "robert.thompson@cra.gc.ca".to_owned(),
                phone: "613-555-0202".to_owned(),
                active_flag: false,
            },
        ],
        activities: vec![
            Activity {
                activity_id: ActivityId::new(40),
                department_id: health.department_id,
                department_name: health.name.clone(),
                app_id: Some(portal.app_id),
                app_name: portal.app_name.clone(),
                activity_type: "meeting".to_owned(),
                date: Some("2025-01-15".to_owned()),
                summary: "Quarterly review".to_owned(),
                next_action: "Send minutes".to_owned(),
                owner: "Sarah".to_owned(),
            },
            Activity {
                activity_id: ActivityId::new(41),
                department_id: revenue.department_id,
                department_name: revenue.name.clone(),
                app_id: None,
                app_name: String::new(),
                activity_type: "email".to_owned(),
                date: Some("2025-02-03".to_owned()),
                summary: "Certificate renewal reminder".to_owned(),
                next_action: String::new(),
                owner: "Robert".to_owned(),
            },
        ],
        incidents: vec![Incident {
            incident_id: IncidentId::new(50),
            app_id: tracker.app_id,
            app_name: tracker.app_name.clone(),
            department_name: tracker.department_name.clone(),
            severity: "high".to_owned(),
            status: "open".to_owned(),
            description: "Sign-in loop after credential reset".to_owned(),
            root_cause: String::new(),
            created_at: Some("2025-02-10T08:00:00".to_owned()),
            resolved_at: None,
        }],
        applications: vec![portal, tracker, tax],
        departments: vec![health, revenue, transport],
        tag_categories: seeded_tag_categories(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    /// Path below the API prefix, e.g. `departments/4`.
    pub path: String,
    pub body: String,
}

impl RecordedRequest {
    pub fn json(&self) -> Result<Value> {
        serde_json::from_str(&self.body).with_context(|| format!("parse body of {}", self.path))
    }
}

type Routes = HashMap<(String, String), (u16, String)>;

/// JSON backend on `127.0.0.1:0` serving canned replies and recording every
/// request it receives. Unknown routes answer 404.
pub struct MockBackend {
    base_url: String,
    server: Arc<Server>,
    routes: Arc<Mutex<Routes>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    worker: Option<JoinHandle<()>>,
}

pub const API_PREFIX: &str = "/api/";

impl MockBackend {
    pub fn start() -> Result<Self> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let base_url = format!("http://{}/api", server.server_addr());
        let server = Arc::new(server);
        let routes: Arc<Mutex<Routes>> = Arc::default();
        let requests: Arc<Mutex<Vec<RecordedRequest>>> = Arc::default();

        let worker = {
            let server = Arc::clone(&server);
            let routes = Arc::clone(&routes);
            let requests = Arc::clone(&requests);
            std::thread::spawn(move || {
                while let Ok(mut request) = server.recv() {
                    let mut body = String::new();
                    let _ = request.as_reader().read_to_string(&mut body);
                    let method = request.method().to_string();
                    let path = request
                        .url()
                        .strip_prefix(API_PREFIX)
                        .unwrap_or(request.url())
                        .to_owned();

                    let (status, reply) = routes
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .get(&(method.clone(), path.clone()))
                        .cloned()
                        .unwrap_or_else(|| (404, r#"{"error":"not found"}"#.to_owned()));
                    requests
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(RecordedRequest { method, path, body });

                    let mut response = Response::from_string(reply).with_status_code(status);
                    if let Ok(header) = Header::from_bytes("Content-Type", "application/json") {
                        response = response.with_header(header);
                    }
                    let _ = request.respond(response);
                }
            })
        };

        Ok(Self {
            base_url,
            server,
            routes,
            requests,
            worker: Some(worker),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn route(&self, method: &str, path: &str, status: u16, body: impl Into<String>) {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((method.to_owned(), path.to_owned()), (status, body.into()));
    }

    pub fn route_json(&self, method: &str, path: &str, value: &Value) {
        self.route(method, path, 200, value.to_string());
    }

    /// Serves every collection, `tags` and each `tags/{name}` from `snapshot`.
    pub fn serve_snapshot(&self, snapshot: &DataSnapshot) -> Result<()> {
        let collections = [
            ("departments", serde_json::to_value(&snapshot.departments)?),
            ("applications", serde_json::to_value(&snapshot.applications)?),
            ("integrations", serde_json::to_value(&snapshot.integrations)?),
            ("contacts", serde_json::to_value(&snapshot.contacts)?),
            ("activities", serde_json::to_value(&snapshot.activities)?),
            ("incidents", serde_json::to_value(&snapshot.incidents)?),
            ("tags", serde_json::to_value(&snapshot.tag_categories)?),
        ];
        for (path, value) in &collections {
            self.route_json("GET", path, value);
        }
        for category in &snapshot.tag_categories {
            let detail = TagCategoryDetail {
                category: TagCategory {
                    tags: Vec::new(),
                    ..category.clone()
                },
                tags: category.tags.clone(),
            };
            self.route_json(
                "GET",
                &format!("tags/{}", category.name),
                &serde_json::to_value(&detail)?,
            );
        }
        Ok(())
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Requests other than `GET`.
    pub fn mutations(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.method != "GET")
            .collect()
    }

    pub fn clear_requests(&self) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{OrgFaker, sample_snapshot, seeded_tag_categories};
    use crmdesk_app::{TagColorMap, TagField, split_multi_value};
    use std::collections::BTreeSet;

    #[test]
    fn same_seed_same_data() {
        let left = OrgFaker::new(42).snapshot(4);
        let right = OrgFaker::new(42).snapshot(4);
        assert_eq!(left, right);
    }

    #[test]
    fn different_seeds_vary() {
        let names = (1..6)
            .map(|seed| OrgFaker::new(seed).snapshot(1).departments[0].name.clone())
            .collect::<BTreeSet<_>>();
        assert!(names.len() > 1);
    }

    #[test]
    fn generated_ids_are_unique_and_linked() {
        let snapshot = OrgFaker::new(7).snapshot(6);
        assert_eq!(snapshot.departments.len(), 6);
        assert_eq!(snapshot.integrations.len(), snapshot.applications.len());
        for app in &snapshot.applications {
            assert!(
                snapshot
                    .departments
                    .iter()
                    .any(|dept| dept.department_id == app.department_id)
            );
            let auth = split_multi_value(&app.auth_type);
            assert!(!auth.is_empty() && auth.len() <= 2, "{}", app.auth_type);
        }
        let ids = snapshot
            .applications
            .iter()
            .map(|app| app.app_id.get())
            .collect::<BTreeSet<_>>();
        assert_eq!(ids.len(), snapshot.applications.len());
    }

    #[test]
    fn seeded_tags_cover_every_field() {
        let categories = seeded_tag_categories();
        let colors = TagColorMap::from_categories(&categories);
        for field in TagField::ALL {
            assert!(
                categories.iter().any(|category| category.name == field.category()),
                "missing {}",
                field.category()
            );
        }
        assert_eq!(
            colors.badge(TagField::DepartmentTier, "critical").color(),
            Some("#E74C3C")
        );
    }

    #[test]
    fn sample_snapshot_is_consistent() {
        let snapshot = sample_snapshot();
        assert_eq!(snapshot.departments.len(), 3);
        assert_eq!(snapshot.applications.len(), 3);
        assert_eq!(snapshot.incidents[0].app_name, "Vaccine Tracker");
    }
}
