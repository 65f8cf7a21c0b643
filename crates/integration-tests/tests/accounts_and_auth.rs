// Accounts, sessions and the location tree against a real SQLite database

mod common;

use common::{dob, new_user, Office, TestEnv, FARMER_EMAIL, HOUR_MS, PASSWORD};
use kissan_core::application::NewLocation;
use kissan_core::domain::{DomainError, LocationLevel, Role, UserUpdate};
use kissan_core::port::UserFilter;
use kissan_core::AppError;

/// First start creates exactly one Admin with the role+DOB password
#[tokio::test]
async fn test_bootstrap_admin_created_once() {
    let env = TestEnv::new().await;

    let issued = env.bootstrap_admin().await;
    assert_eq!(issued.user.role, Role::Admin);
    assert_eq!(issued.initial_password, "Admin@15011980");
    assert!(issued.user.must_change_password);
    assert!(issued.user.location_id.is_none());

    let again = env
        .services
        .users
        .ensure_bootstrap_admin(kissan_core::application::BootstrapAdmin {
            full_name: "Someone Else".to_string(),
            email: "other@kissan.example.in".to_string(),
            mobile: "9800000002".to_string(),
            date_of_birth: dob(1990, 2, 2),
        })
        .await
        .unwrap();
    assert!(again.is_none());

    let mail = env.notifier.sent_to("admin@kissan.example.in");
    assert_eq!(mail.len(), 1);
    assert!(mail[0].text_body.contains("Admin@15011980"));

    println!("✅ Bootstrap admin: created once, password Admin@DDMMYYYY");
}

/// Talati-registered farmers land in the Talati's village and are emailed
/// their temporary password
#[tokio::test]
async fn test_talati_registers_farmer_in_own_village() {
    let office = Office::open().await;
    let services = office.services();

    let issued = services
        .users
        .create(
            &office.talati,
            new_user(Role::Farmer, "Suresh Bhosale", "suresh@example.in", "9123456780", None),
        )
        .await
        .unwrap();

    assert_eq!(issued.initial_password, "Farmer@05031985");
    assert_eq!(issued.user.location_id.as_ref(), Some(&office.places.village.id));
    assert!(issued.user.must_change_password);

    let mail = office.env.notifier.sent_to("suresh@example.in");
    assert_eq!(mail.len(), 1);
    assert!(mail[0].text_body.contains("Farmer@05031985"));

    // Another village is out of reach
    let result = services
        .users
        .create(
            &office.talati,
            new_user(
                Role::Farmer,
                "Outsider",
                "outsider@example.in",
                "9123456781",
                Some(&office.places.other_village),
            ),
        )
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));

    // Staff accounts are Admin-only
    let result = services
        .users
        .create(
            &office.talati,
            new_user(
                Role::Chowkidar,
                "Helper",
                "helper@example.in",
                "9123456782",
                Some(&office.places.village),
            ),
        )
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));

    println!("✅ Talati registration limited to own-village farmers");
}

#[tokio::test]
async fn test_user_listing_is_scoped() {
    let office = Office::open().await;
    let services = office.services();

    let all = services
        .users
        .list(&office.admin, UserFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 8);

    // Talati sees only the farmers of Wagholi, whatever filter it asks for
    let farmers = services
        .users
        .list(
            &office.talati,
            UserFilter {
                role: Some(Role::Engineer),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(farmers.len(), 1);
    assert_eq!(farmers[0].email, FARMER_EMAIL);

    let result = services
        .users
        .list(&office.karkoon, UserFilter::default())
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));

    // Engineer covers Wagholi, so it may open the farmer's profile
    let farmer = services
        .users
        .get(&office.engineer, &office.farmer.user_id)
        .await
        .unwrap();
    assert_eq!(farmer.role, Role::Farmer);

    let result = services
        .users
        .get(&office.other_talati, &office.farmer.user_id)
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn test_email_and_mobile_are_unique() {
    let office = Office::open().await;
    let services = office.services();

    let duplicate_email = services
        .users
        .create(
            &office.admin,
            new_user(
                Role::Farmer,
                "Copy",
                " Ramesh.Patil@EXAMPLE.in ",
                "9000011111",
                Some(&office.places.village),
            ),
        )
        .await;
    assert!(matches!(duplicate_email, Err(AppError::Conflict(_))));

    let duplicate_mobile = services
        .users
        .create(
            &office.admin,
            new_user(
                Role::Farmer,
                "Copy",
                "copy@example.in",
                "+91 98765-43210",
                Some(&office.places.village),
            ),
        )
        .await;
    assert!(matches!(duplicate_mobile, Err(AppError::Conflict(_))));

    // Updating a user onto someone else's email is refused too
    let result = services
        .users
        .update(
            &office.admin,
            &office.other_farmer.user_id,
            UserUpdate {
                email: Some(FARMER_EMAIL.to_string()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn test_role_must_match_location_level() {
    let office = Office::open().await;

    let result = office
        .services()
        .users
        .create(
            &office.admin,
            new_user(
                Role::Talati,
                "Misplaced",
                "misplaced@example.in",
                "9000022222",
                Some(&office.places.district),
            ),
        )
        .await;
    assert!(matches!(
        result,
        Err(AppError::Domain(DomainError::JurisdictionMismatch { .. }))
    ));
}

/// Email (any case) or mobile (any format) both log in
#[tokio::test]
async fn test_login_accepts_email_or_mobile() {
    let office = Office::open().await;
    let auth = &office.services().auth;

    let by_email = auth.login("  RAMESH.PATIL@example.IN ", PASSWORD).await.unwrap();
    assert_eq!(by_email.user.id, office.farmer.user_id);

    let by_mobile = auth.login("+91 98765 43210", PASSWORD).await.unwrap();
    assert_eq!(by_mobile.user.id, office.farmer.user_id);
    assert_ne!(by_email.session.token, by_mobile.session.token);

    let wrong = auth.login(FARMER_EMAIL, "not-the-password1").await;
    assert!(matches!(wrong, Err(AppError::Unauthorized(_))));

    let unknown = auth.login("nobody@example.in", PASSWORD).await;
    assert!(matches!(unknown, Err(AppError::Unauthorized(_))));
}

#[tokio::test]
async fn test_change_password_revokes_other_sessions() {
    let office = Office::open().await;
    let auth = &office.services().auth;

    let first = auth.login(FARMER_EMAIL, PASSWORD).await.unwrap().session.token;
    let second = auth.login(FARMER_EMAIL, PASSWORD).await.unwrap().session.token;
    let principal = auth.authenticate(&first).await.unwrap();

    // Policy and current-password checks come first
    let result = auth.change_password(&principal, &first, PASSWORD, "short1").await;
    assert!(matches!(
        result,
        Err(AppError::Domain(DomainError::ValidationError(_)))
    ));
    let result = auth
        .change_password(&principal, &first, "wrong-current1", "Another2025pass")
        .await;
    assert!(matches!(result, Err(AppError::Unauthorized(_))));

    auth.change_password(&principal, &first, PASSWORD, "Another2025pass")
        .await
        .unwrap();

    assert!(auth.authenticate(&first).await.is_ok());
    assert!(matches!(
        auth.authenticate(&second).await,
        Err(AppError::Unauthorized(_))
    ));
    assert!(matches!(
        auth.authenticate(&office.farmer_token).await,
        Err(AppError::Unauthorized(_))
    ));
    assert!(auth.login(FARMER_EMAIL, "Another2025pass").await.is_ok());

    println!("✅ Password change keeps only the current session");
}

#[tokio::test]
async fn test_session_expires_after_ttl() {
    let office = Office::open().await;
    let auth = &office.services().auth;

    let token = auth.login(FARMER_EMAIL, PASSWORD).await.unwrap().session.token;

    office.env.clock.advance(12 * HOUR_MS - 1);
    assert!(auth.authenticate(&token).await.is_ok());

    office.env.clock.advance(1);
    assert!(matches!(
        auth.authenticate(&token).await,
        Err(AppError::Unauthorized(_))
    ));

    // Logout is idempotent for an already-purged token
    auth.logout(&token).await.unwrap();
}

#[tokio::test]
async fn test_deactivation_blocks_login_and_revokes_sessions() {
    let office = Office::open().await;
    let services = office.services();

    let user = services
        .users
        .set_active(&office.admin, &office.farmer.user_id, false)
        .await
        .unwrap();
    assert!(!user.active);

    assert!(matches!(
        services.auth.authenticate(&office.farmer_token).await,
        Err(AppError::Unauthorized(_))
    ));
    assert!(matches!(
        services.auth.login(FARMER_EMAIL, PASSWORD).await,
        Err(AppError::Unauthorized(_))
    ));

    let result = services
        .users
        .set_active(&office.admin, &office.admin.user_id, false)
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    services
        .users
        .set_active(&office.admin, &office.farmer.user_id, true)
        .await
        .unwrap();
    assert!(services.auth.login(FARMER_EMAIL, PASSWORD).await.is_ok());
}

#[tokio::test]
async fn test_reset_password_forces_change() {
    let office = Office::open().await;
    let services = office.services();

    let issued = services
        .users
        .reset_password(&office.admin, &office.farmer.user_id)
        .await
        .unwrap();
    assert_eq!(issued.initial_password, "Farmer@05031985");
    assert!(issued.user.must_change_password);

    assert!(services.auth.authenticate(&office.farmer_token).await.is_err());
    assert!(services.auth.login(FARMER_EMAIL, PASSWORD).await.is_err());

    let outcome = services
        .auth
        .login(FARMER_EMAIL, &issued.initial_password)
        .await
        .unwrap();
    assert!(outcome.user.must_change_password);

    let principal = services
        .auth
        .authenticate(&outcome.session.token)
        .await
        .unwrap();
    assert!(matches!(
        principal.require_password_current(),
        Err(AppError::PasswordChangeRequired)
    ));

    let mail = office.env.notifier.sent_to(FARMER_EMAIL);
    assert!(mail.iter().any(|n| n.subject.contains("password reset")));

    // Only Admin resets
    let result = services
        .users
        .reset_password(&office.talati, &office.farmer.user_id)
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn test_location_tree_rules() {
    let office = Office::open().await;
    let locations = &office.services().locations;
    let places = &office.places;

    let path = locations.path(&places.village.id).await.unwrap();
    let names: Vec<_> = path.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, ["Maharashtra", "Pune", "Haveli", "Wagholi"]);

    let villages = locations
        .list(Some(&places.subdistrict.id), Some(LocationLevel::Village))
        .await
        .unwrap();
    assert_eq!(villages.len(), 2);

    // A village cannot hang directly under a district
    let result = locations
        .create(
            &office.admin,
            NewLocation {
                name: "Kharadi".to_string(),
                level: LocationLevel::Village,
                parent_id: Some(places.district.id.clone()),
                code: None,
            },
        )
        .await;
    assert!(matches!(
        result,
        Err(AppError::Domain(DomainError::InvalidParent { .. }))
    ));

    // Sibling names are unique
    let result = locations
        .create(
            &office.admin,
            NewLocation {
                name: "Wagholi".to_string(),
                level: LocationLevel::Village,
                parent_id: Some(places.subdistrict.id.clone()),
                code: None,
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    // In-use locations stay; an empty leaf can go
    let result = locations.delete(&office.admin, &places.village.id).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    let spare = office
        .env
        .add_location(&office.admin, "Kesnand", LocationLevel::Village, Some(&places.subdistrict))
        .await;
    let renamed = locations
        .rename(&office.admin, &spare.id, "  Kesnand   Gaon ")
        .await
        .unwrap();
    assert_eq!(renamed.name, "Kesnand Gaon");
    locations.delete(&office.admin, &spare.id).await.unwrap();
    assert!(matches!(
        locations.get(&spare.id).await,
        Err(AppError::NotFound(_))
    ));

    let result = locations.rename(&office.talati, &places.village.id, "X").await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

/// A dead mail relay never blocks account work
#[tokio::test]
async fn test_mail_failure_does_not_fail_operations() {
    let env = TestEnv::with_failing_mail().await;

    let issued = env.bootstrap_admin().await;
    let (_, admin) = env
        .activate(&issued.user.email, &issued.initial_password)
        .await;

    let issued = env
        .services
        .users
        .create(
            &admin,
            new_user(Role::Admin, "Second Admin", "admin2@example.in", "9811112222", None),
        )
        .await
        .unwrap();
    assert_eq!(issued.initial_password, "Admin@05031985");

    env.services
        .users
        .reset_password(&admin, &issued.user.id)
        .await
        .unwrap();

    assert!(env.notifier.sent().is_empty());
}
