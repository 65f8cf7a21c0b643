//! Shared fixture: an in-memory office with a location tree and one
//! account per role, all past their first-login password change.

#![allow(dead_code)]

use chrono::NaiveDate;
use kissan_core::application::{
    AuthConfig, BootstrapAdmin, IssuedCredentials, MaintenanceScheduler, NewLocation, Principal,
    ServiceContext, Services,
};
use kissan_core::domain::{Location, LocationLevel, NewUser, Role};
use kissan_core::port::id_provider::mocks::SequentialIdProvider;
use kissan_core::port::notifier::mocks::{FailingNotifier, RecordingNotifier};
use kissan_core::port::time_provider::mocks::FixedTimeProvider;
use kissan_core::port::{MaintenanceConfig, Notifier};
use kissan_infra_sqlite::{
    create_pool, run_migrations, SqliteApplicationRepository, SqliteLocationRepository,
    SqliteMaintenance, SqlitePaymentRepository, SqliteSequenceRepository, SqliteSessionRepository,
    SqliteUserRepository,
};
use std::sync::Arc;

pub const PASSWORD: &str = "Kissan2025pass";
pub const HOUR_MS: i64 = 3_600_000;

/// 15 June 2025, 10:00 IST
pub fn start_millis() -> i64 {
    NaiveDate::from_ymd_opt(2025, 6, 15)
        .unwrap()
        .and_hms_opt(4, 30, 0)
        .unwrap()
        .and_utc()
        .timestamp_millis()
}

pub fn dob(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Services over a fresh in-memory database
pub struct TestEnv {
    pub services: Services,
    pub maintenance: MaintenanceScheduler,
    pub notifier: RecordingNotifier,
    pub clock: Arc<FixedTimeProvider>,
}

impl TestEnv {
    pub async fn new() -> Self {
        let notifier = RecordingNotifier::new();
        Self::build(Arc::new(notifier.clone()), notifier).await
    }

    /// Every email fails to send; `notifier` stays empty
    pub async fn with_failing_mail() -> Self {
        Self::build(Arc::new(FailingNotifier), RecordingNotifier::new()).await
    }

    async fn build(mail: Arc<dyn Notifier>, notifier: RecordingNotifier) -> Self {
        let pool = create_pool(":memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();

        let clock = Arc::new(FixedTimeProvider::new(start_millis()));

        let ctx = ServiceContext {
            users: Arc::new(SqliteUserRepository::new(pool.clone())),
            locations: Arc::new(SqliteLocationRepository::new(pool.clone())),
            applications: Arc::new(SqliteApplicationRepository::new(pool.clone())),
            payments: Arc::new(SqlitePaymentRepository::new(pool.clone())),
            sessions: Arc::new(SqliteSessionRepository::new(pool.clone())),
            sequences: Arc::new(SqliteSequenceRepository::new(pool.clone())),
            notifier: mail,
            id_provider: Arc::new(SequentialIdProvider::new("id")),
            time_provider: clock.clone(),
        };
        let services = Services::new(
            ctx,
            AuthConfig {
                session_ttl_ms: 12 * HOUR_MS,
            },
        );
        let maintenance = MaintenanceScheduler::new(
            Arc::new(SqliteMaintenance::new(pool, clock.clone())),
            MaintenanceConfig::default(),
            24,
        );

        Self {
            services,
            maintenance,
            notifier,
            clock,
        }
    }

    /// Log in with the initial password, change it to [`PASSWORD`] and
    /// return the session token with the now-current principal.
    pub async fn activate(&self, identifier: &str, initial_password: &str) -> (String, Principal) {
        let outcome = self
            .services
            .auth
            .login(identifier, initial_password)
            .await
            .unwrap();
        assert!(outcome.user.must_change_password);

        let token = outcome.session.token;
        let principal = self.services.auth.authenticate(&token).await.unwrap();
        self.services
            .auth
            .change_password(&principal, &token, initial_password, PASSWORD)
            .await
            .unwrap();

        let principal = self.services.auth.authenticate(&token).await.unwrap();
        assert!(!principal.must_change_password);
        (token, principal)
    }

    pub async fn bootstrap_admin(&self) -> IssuedCredentials {
        self.services
            .users
            .ensure_bootstrap_admin(BootstrapAdmin {
                full_name: "Sunita Deshmukh".to_string(),
                email: "admin@kissan.example.in".to_string(),
                mobile: "9800000001".to_string(),
                date_of_birth: dob(1980, 1, 15),
            })
            .await
            .unwrap()
            .expect("empty database gets an administrator")
    }

    pub async fn add_location(
        &self,
        admin: &Principal,
        name: &str,
        level: LocationLevel,
        parent: Option<&Location>,
    ) -> Location {
        self.services
            .locations
            .create(
                admin,
                NewLocation {
                    name: name.to_string(),
                    level,
                    parent_id: parent.map(|p| p.id.clone()),
                    code: None,
                },
            )
            .await
            .unwrap()
    }

    pub async fn add_user(
        &self,
        creator: &Principal,
        role: Role,
        name: &str,
        email: &str,
        mobile: &str,
        location: Option<&Location>,
    ) -> IssuedCredentials {
        self.services
            .users
            .create(creator, new_user(role, name, email, mobile, location))
            .await
            .unwrap()
    }
}

pub fn new_user(
    role: Role,
    name: &str,
    email: &str,
    mobile: &str,
    location: Option<&Location>,
) -> NewUser {
    NewUser {
        full_name: name.to_string(),
        email: email.to_string(),
        mobile: mobile.to_string(),
        role,
        date_of_birth: dob(1985, 3, 5),
        location_id: location.map(|l| l.id.clone()),
    }
}

/// Maharashtra > Pune > Haveli > {Wagholi, Lohegaon}
pub struct Places {
    pub state: Location,
    pub district: Location,
    pub subdistrict: Location,
    pub village: Location,
    pub other_village: Location,
}

/// A working office: every reviewer for Wagholi, a Talati for Lohegaon,
/// and one farmer in each village.
pub struct Office {
    pub env: TestEnv,
    pub places: Places,
    pub admin: Principal,
    pub admin_token: String,
    pub engineer: Principal,
    pub karkoon: Principal,
    pub talati: Principal,
    pub chowkidar: Principal,
    pub other_talati: Principal,
    pub farmer: Principal,
    pub farmer_token: String,
    pub other_farmer: Principal,
}

pub const FARMER_EMAIL: &str = "ramesh.patil@example.in";

impl Office {
    pub async fn open() -> Self {
        let env = TestEnv::new().await;

        let issued = env.bootstrap_admin().await;
        let (admin_token, admin) = env
            .activate(&issued.user.email, &issued.initial_password)
            .await;

        let state = env
            .add_location(&admin, "Maharashtra", LocationLevel::State, None)
            .await;
        let district = env
            .add_location(&admin, "Pune", LocationLevel::District, Some(&state))
            .await;
        let subdistrict = env
            .add_location(&admin, "Haveli", LocationLevel::Subdistrict, Some(&district))
            .await;
        let village = env
            .add_location(&admin, "Wagholi", LocationLevel::Village, Some(&subdistrict))
            .await;
        let other_village = env
            .add_location(&admin, "Lohegaon", LocationLevel::Village, Some(&subdistrict))
            .await;

        let staff = [
            (Role::Engineer, "Anil Kulkarni", "engineer@example.in", "9811111111", &district),
            (Role::Karkoon, "Meena Jadhav", "karkoon@example.in", "9822222222", &subdistrict),
            (Role::Talati, "Vijay Pawar", "talati@example.in", "9833333333", &village),
            (Role::Chowkidar, "Ganesh More", "chowkidar@example.in", "9844444444", &village),
            (Role::Talati, "Sanjay Shinde", "talati2@example.in", "9855555555", &other_village),
        ];
        let mut principals = Vec::new();
        for (role, name, email, mobile, location) in staff {
            let issued = env
                .add_user(&admin, role, name, email, mobile, Some(location))
                .await;
            let (_, principal) = env.activate(email, &issued.initial_password).await;
            principals.push(principal);
        }
        let mut principals = principals.into_iter();
        let engineer = principals.next().unwrap();
        let karkoon = principals.next().unwrap();
        let talati = principals.next().unwrap();
        let chowkidar = principals.next().unwrap();
        let other_talati = principals.next().unwrap();

        let issued = env
            .add_user(&talati, Role::Farmer, "Ramesh Patil", FARMER_EMAIL, "9876543210", None)
            .await;
        let (farmer_token, farmer) = env.activate(FARMER_EMAIL, &issued.initial_password).await;

        let issued = env
            .add_user(
                &other_talati,
                Role::Farmer,
                "Kavita Gaikwad",
                "kavita@example.in",
                "9765432109",
                None,
            )
            .await;
        let (_, other_farmer) = env
            .activate("kavita@example.in", &issued.initial_password)
            .await;

        Self {
            env,
            places: Places {
                state,
                district,
                subdistrict,
                village,
                other_village,
            },
            admin,
            admin_token,
            engineer,
            karkoon,
            talati,
            chowkidar,
            other_talati,
            farmer,
            farmer_token,
            other_farmer,
        }
    }

    pub fn services(&self) -> &Services {
        &self.env.services
    }
}
