use std::{error::Error, sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Path, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        request, HeaderValue, Method, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, RequestPartsExt as _, Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use derive_more::From;
use itertools::Itertools as _;
use jsonwebtoken::{
    decode, encode, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::{fs, net, task};
use tower_http::cors::CorsLayer;
use tracing_subscriber::{
    layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

use laundry_tracker::{
    access::{self, Role},
    api, db, Config,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = fs::read_to_string("config.toml").await?;
    let config = toml::from_str::<Config>(&config)?;

    let (db_client, db_connection) = db::connect(config.db).await?;

    task::spawn(async move {
        if let Err(e) = db_connection.await {
            panic!("database connection failed: {e}");
        }
    });

    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);
    for origin in &config.http.cors.allowed_origins {
        cors = cors.allow_origin(origin.parse::<HeaderValue>()?);
    }

    let app = Router::new()
        .route("/auth/student/register", post(register_student))
        .route("/auth/student/login", post(login_student))
        .route("/auth/staff/register", post(register_staff))
        .route("/auth/staff/login", post(login_staff))
        .route("/laundry", get(list_laundry).post(add_laundry))
        .route("/laundry/my", get(my_laundry))
        .route("/laundry/:id", patch(update_status))
        .route("/laundry/:id/issue", patch(update_issue))
        .layer(cors)
        .with_state(Arc::new(AppState {
            db_client,
            jwt_expiration_time: config.jwt.expiration_time,
            jwt_decoding_key: DecodingKey::from_secret(
                config.jwt.secret.as_bytes(),
            ),
            jwt_encoding_key: EncodingKey::from_secret(
                config.jwt.secret.as_bytes(),
            ),
            student_email_domain: config.registration.student_email_domain,
        }));

    let listener = net::TcpListener::bind(config.http.server.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterStudentInput {
    name: String,
    email: String,
    password: String,
    bag_number: String,
    gender: String,
}

async fn register_student(
    State(state): State<SharedAppState>,
    Json(input): Json<RegisterStudentInput>,
) -> Result<(StatusCode, Json<api::Student>), RegisterStudentError> {
    use RegisterStudentError as E;

    if !input.email.ends_with(&state.student_email_domain) {
        return Err(E::InvalidEmailDomain);
    }

    let password_hash = db::student::PasswordHash::new(&input.password)?;
    let student = state
        .db_client
        .add_student(db::student::NewStudent {
            name: input.name,
            email: input.email,
            gender: input.gender,
            bag_number: input.bag_number,
            password_hash,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(api::Student {
            name: student.name,
            email: student.email,
            gender: student.gender,
            bag_number: student.bag_number,
        }),
    ))
}

#[derive(Debug, From)]
pub enum RegisterStudentError {
    #[from]
    DbError(db::Error),
    #[from]
    PasswordHash(argon2::password_hash::Error),
    InvalidEmailDomain,
}

impl IntoResponse for RegisterStudentError {
    fn into_response(self) -> Response {
        match self {
            Self::InvalidEmailDomain => {
                error_response(StatusCode::BAD_REQUEST, "Invalid email domain")
            }
            Self::DbError(_) | Self::PasswordHash(_) => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to register student",
            ),
        }
    }
}

#[derive(Deserialize)]
struct LoginInput {
    email: String,
    password: String,
}

async fn login_student(
    State(state): State<SharedAppState>,
    Json(LoginInput { email, password }): Json<LoginInput>,
) -> Result<Json<api::AuthToken>, LoginStudentError> {
    use LoginStudentError as E;

    if !email.ends_with(&state.student_email_domain) {
        return Err(E::ForeignEmailDomain);
    }

    let student = state
        .db_client
        .get_student_by_email(&email)
        .await?
        .ok_or(E::StudentNotFound)?;
    if !student.password_hash.verify(&password) {
        return Err(E::WrongPassword);
    }

    let token = issue_token(&state, student.id.into(), Role::Student)?;
    Ok(Json(api::AuthToken { token }))
}

#[derive(Debug, From)]
pub enum LoginStudentError {
    #[from]
    DbError(db::Error),
    #[from]
    Token(jsonwebtoken::errors::Error),
    ForeignEmailDomain,
    StudentNotFound,
    WrongPassword,
}

impl IntoResponse for LoginStudentError {
    fn into_response(self) -> Response {
        match self {
            Self::ForeignEmailDomain => error_response(
                StatusCode::BAD_REQUEST,
                "Only university emails allowed",
            ),
            Self::StudentNotFound => {
                error_response(StatusCode::NOT_FOUND, "No student found")
            }
            Self::WrongPassword => {
                error_response(StatusCode::UNAUTHORIZED, "Incorrect password")
            }
            Self::DbError(_) | Self::Token(_) => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to log in",
            ),
        }
    }
}

#[derive(Deserialize)]
struct RegisterStaffInput {
    name: String,
    email: String,
    password: String,
}

async fn register_staff(
    State(state): State<SharedAppState>,
    Json(input): Json<RegisterStaffInput>,
) -> Result<StatusCode, RegisterStaffError> {
    let password_hash = db::student::PasswordHash::new(&input.password)?;
    state
        .db_client
        .add_staff(input.name, input.email, password_hash)
        .await?;

    Ok(StatusCode::CREATED)
}

#[derive(Debug, From)]
pub enum RegisterStaffError {
    #[from]
    DbError(db::Error),
    #[from]
    PasswordHash(argon2::password_hash::Error),
}

impl IntoResponse for RegisterStaffError {
    fn into_response(self) -> Response {
        match self {
            Self::DbError(_) | Self::PasswordHash(_) => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to register staff",
            ),
        }
    }
}

async fn login_staff(
    State(state): State<SharedAppState>,
    Json(LoginInput { email, password }): Json<LoginInput>,
) -> Result<Json<api::AuthToken>, LoginStaffError> {
    use LoginStaffError as E;

    let staff = state
        .db_client
        .get_staff_by_email(&email)
        .await?
        .ok_or(E::StaffNotFound)?;
    if !staff.password_hash.verify(&password) {
        return Err(E::WrongPassword);
    }

    let token = issue_token(&state, staff.id.into(), staff.role)?;
    Ok(Json(api::AuthToken { token }))
}

#[derive(Debug, From)]
pub enum LoginStaffError {
    #[from]
    DbError(db::Error),
    #[from]
    Token(jsonwebtoken::errors::Error),
    StaffNotFound,
    WrongPassword,
}

impl IntoResponse for LoginStaffError {
    fn into_response(self) -> Response {
        match self {
            Self::StaffNotFound => {
                error_response(StatusCode::NOT_FOUND, "No staff found")
            }
            Self::WrongPassword => {
                error_response(StatusCode::UNAUTHORIZED, "Incorrect password")
            }
            Self::DbError(_) | Self::Token(_) => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to log in",
            ),
        }
    }
}

async fn list_laundry(
    State(state): State<SharedAppState>,
    _: AuthClaims,
) -> Result<Json<Vec<api::Laundry>>, ListLaundryError> {
    use ListLaundryError as E;

    let page = state.db_client.get_all_laundry().await?;

    let student_ids = page
        .iter()
        .map(|laundry| laundry.student)
        .unique()
        .collect::<Vec<_>>();
    let students = state.db_client.get_students_by_ids(&student_ids).await?;

    let laundry = page
        .into_iter()
        .map(|laundry| {
            let student = students
                .get(&laundry.student)
                .ok_or(E::StudentNotFound(laundry.student))?;
            Ok::<_, E>(api::Laundry {
                id: laundry.id,
                bag_number: laundry.bag_number,
                shirts: laundry.shirts,
                bottoms: laundry.bottoms,
                towels: laundry.towels,
                bedsheets: laundry.bedsheets,
                others: laundry.others,
                total_items: laundry.total_items,
                status: laundry.status,
                issue: laundry.issue,
                pickup_date: laundry.pickup_date,
                delivery_date: laundry.delivery_date,
                student: api::Student {
                    name: student.name.clone(),
                    email: student.email.clone(),
                    gender: student.gender.clone(),
                    bag_number: student.bag_number.clone(),
                },
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(laundry))
}

#[derive(Debug, From)]
pub enum ListLaundryError {
    #[from]
    DbError(db::Error),
    StudentNotFound(db::student::Id),
}

impl IntoResponse for ListLaundryError {
    fn into_response(self) -> Response {
        match self {
            Self::DbError(_) | Self::StudentNotFound(_) => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch laundry items",
            ),
        }
    }
}

async fn my_laundry(
    State(state): State<SharedAppState>,
    auth_claims: AuthClaims,
) -> Result<Json<Vec<api::Laundry>>, MyLaundryError> {
    use MyLaundryError as E;

    if !matches!(auth_claims.role.parse(), Ok(Role::Student)) {
        return Err(E::NotAStudent);
    }

    let student_id = db::student::Id::from(auth_claims.id);
    let my = state
        .db_client
        .get_student_by_id(student_id)
        .await?
        .ok_or(E::StudentNotFound)?;
    let page = state.db_client.get_laundry_by_student(student_id).await?;

    let student = api::Student {
        name: my.name,
        email: my.email,
        gender: my.gender,
        bag_number: my.bag_number,
    };
    let laundry = page
        .into_iter()
        .map(|laundry| api::Laundry {
            id: laundry.id,
            bag_number: laundry.bag_number,
            shirts: laundry.shirts,
            bottoms: laundry.bottoms,
            towels: laundry.towels,
            bedsheets: laundry.bedsheets,
            others: laundry.others,
            total_items: laundry.total_items,
            status: laundry.status,
            issue: laundry.issue,
            pickup_date: laundry.pickup_date,
            delivery_date: laundry.delivery_date,
            student: student.clone(),
        })
        .collect();

    Ok(Json(laundry))
}

#[derive(Debug, From)]
pub enum MyLaundryError {
    #[from]
    DbError(db::Error),
    NotAStudent,
    StudentNotFound,
}

impl IntoResponse for MyLaundryError {
    fn into_response(self) -> Response {
        match self {
            Self::NotAStudent => {
                error_response(StatusCode::FORBIDDEN, "Unauthorized role")
            }
            Self::DbError(_) | Self::StudentNotFound => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch laundry items",
            ),
        }
    }
}

#[derive(Deserialize)]
struct AddLaundryInput {
    #[serde(default)]
    shirts: usize,
    #[serde(default)]
    bottoms: usize,
    #[serde(default)]
    towels: usize,
    #[serde(default)]
    bedsheets: usize,
    #[serde(default)]
    others: usize,
}

async fn add_laundry(
    State(state): State<SharedAppState>,
    auth_claims: AuthClaims,
    Json(input): Json<AddLaundryInput>,
) -> Result<(StatusCode, Json<api::Laundry>), AddLaundryError> {
    use AddLaundryError as E;

    let student = state
        .db_client
        .get_student_by_id(auth_claims.id.into())
        .await?
        .ok_or(E::StudentNotFound)?;

    let total_items = input.shirts
        + input.bottoms
        + input.towels
        + input.bedsheets
        + input.others;
    if total_items == 0 {
        return Err(E::NoItems);
    }

    let laundry = state
        .db_client
        .add_laundry(db::laundry::NewLaundry {
            student: student.id,
            bag_number: student.bag_number.clone(),
            shirts: input.shirts,
            bottoms: input.bottoms,
            towels: input.towels,
            bedsheets: input.bedsheets,
            others: input.others,
            total_items,
            status: db::laundry::Status::Pending,
            pickup_date: OffsetDateTime::now_utc(),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(api::Laundry {
            id: laundry.id,
            bag_number: laundry.bag_number,
            shirts: laundry.shirts,
            bottoms: laundry.bottoms,
            towels: laundry.towels,
            bedsheets: laundry.bedsheets,
            others: laundry.others,
            total_items: laundry.total_items,
            status: laundry.status,
            issue: laundry.issue,
            pickup_date: laundry.pickup_date,
            delivery_date: laundry.delivery_date,
            student: api::Student {
                name: student.name,
                email: student.email,
                gender: student.gender,
                bag_number: student.bag_number,
            },
        }),
    ))
}

#[derive(Debug, From)]
pub enum AddLaundryError {
    #[from]
    DbError(db::Error),
    NoItems,
    StudentNotFound,
}

impl IntoResponse for AddLaundryError {
    fn into_response(self) -> Response {
        match self {
            Self::NoItems => error_response(
                StatusCode::BAD_REQUEST,
                "Please add at least one item",
            ),
            Self::StudentNotFound => {
                error_response(StatusCode::NOT_FOUND, "Student not found")
            }
            Self::DbError(_) => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create laundry ticket",
            ),
        }
    }
}

#[derive(Deserialize)]
struct UpdateStatusInput {
    status: String,
}

async fn update_status(
    State(state): State<SharedAppState>,
    auth_claims: AuthClaims,
    Path(id): Path<api::laundry::Id>,
    Json(UpdateStatusInput { status }): Json<UpdateStatusInput>,
) -> Result<Json<api::Laundry>, UpdateStatusError> {
    use UpdateStatusError as E;

    tracing::info!(
        %id,
        %status,
        role = %auth_claims.role,
        "status update request received"
    );

    let status = access::authorize_status_update(&auth_claims.role, &status)
        .map_err(|denied| {
            tracing::warn!(?denied, "status update rejected");
            denied
        })?;

    let mut laundry = state
        .db_client
        .get_laundry_by_id(id)
        .await?
        .ok_or(E::LaundryNotFound)?;

    laundry.status = status;
    if status == db::laundry::Status::Delivered {
        // Unreachable while no role may set DELIVERED; kept so a delivery
        // date is still stamped should the permitted sets open up again.
        laundry.delivery_date = Some(OffsetDateTime::now_utc());
    }

    state.db_client.write_laundry(&laundry).await?;

    let student = state
        .db_client
        .get_student_by_id(laundry.student)
        .await?
        .ok_or(E::StudentNotFound)?;

    tracing::info!(%id, "laundry status updated");

    Ok(Json(api::Laundry {
        id: laundry.id,
        bag_number: laundry.bag_number,
        shirts: laundry.shirts,
        bottoms: laundry.bottoms,
        towels: laundry.towels,
        bedsheets: laundry.bedsheets,
        others: laundry.others,
        total_items: laundry.total_items,
        status: laundry.status,
        issue: laundry.issue,
        pickup_date: laundry.pickup_date,
        delivery_date: laundry.delivery_date,
        student: api::Student {
            name: student.name,
            email: student.email,
            gender: student.gender,
            bag_number: student.bag_number,
        },
    }))
}

#[derive(Debug, From)]
pub enum UpdateStatusError {
    #[from]
    DbError(db::Error),
    #[from]
    Denied(access::Denied),
    LaundryNotFound,
    StudentNotFound,
}

impl IntoResponse for UpdateStatusError {
    fn into_response(self) -> Response {
        use access::Denied;

        match self {
            Self::Denied(Denied::InvalidStatus) => {
                error_response(StatusCode::BAD_REQUEST, "Invalid status")
            }
            Self::Denied(Denied::RoleForbids(Role::Staff)) => error_response(
                StatusCode::FORBIDDEN,
                "Staff can only set status to PENDING or WASHED",
            ),
            Self::Denied(Denied::RoleForbids(Role::Student)) => {
                error_response(
                    StatusCode::FORBIDDEN,
                    "Students can only mark items as PICKED_UP",
                )
            }
            Self::Denied(Denied::UnknownRole) => {
                error_response(StatusCode::FORBIDDEN, "Unauthorized role")
            }
            // A vanished ticket surfaces as the generic failure: there is
            // no distinct not-found path on this endpoint.
            Self::DbError(_)
            | Self::LaundryNotFound
            | Self::StudentNotFound => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update laundry status",
            ),
        }
    }
}

#[derive(Deserialize)]
struct UpdateIssueInput {
    #[serde(default)]
    issue: Option<String>,
}

async fn update_issue(
    State(state): State<SharedAppState>,
    _: AuthClaims,
    Path(id): Path<api::laundry::Id>,
    Json(UpdateIssueInput { issue }): Json<UpdateIssueInput>,
) -> Result<Json<api::Laundry>, UpdateIssueError> {
    use UpdateIssueError as E;

    tracing::info!(%id, ?issue, "issue update request received");

    let mut laundry = state
        .db_client
        .get_laundry_by_id(id)
        .await?
        .ok_or(E::LaundryNotFound)?;

    // An empty note clears the field.
    laundry.issue = issue.filter(|issue| !issue.is_empty());

    state.db_client.write_laundry(&laundry).await?;

    let student = state
        .db_client
        .get_student_by_id(laundry.student)
        .await?
        .ok_or(E::StudentNotFound)?;

    tracing::info!(%id, "laundry issue updated");

    Ok(Json(api::Laundry {
        id: laundry.id,
        bag_number: laundry.bag_number,
        shirts: laundry.shirts,
        bottoms: laundry.bottoms,
        towels: laundry.towels,
        bedsheets: laundry.bedsheets,
        others: laundry.others,
        total_items: laundry.total_items,
        status: laundry.status,
        issue: laundry.issue,
        pickup_date: laundry.pickup_date,
        delivery_date: laundry.delivery_date,
        student: api::Student {
            name: student.name,
            email: student.email,
            gender: student.gender,
            bag_number: student.bag_number,
        },
    }))
}

#[derive(Debug, From)]
pub enum UpdateIssueError {
    #[from]
    DbError(db::Error),
    LaundryNotFound,
    StudentNotFound,
}

impl IntoResponse for UpdateIssueError {
    fn into_response(self) -> Response {
        match self {
            Self::DbError(_)
            | Self::LaundryNotFound
            | Self::StudentNotFound => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update laundry issue",
            ),
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(api::Error {
            message: message.to_owned(),
        }),
    )
        .into_response()
}

fn issue_token(
    state: &AppState,
    id: i32,
    role: Role,
) -> Result<String, jsonwebtoken::errors::Error> {
    let expires_at = OffsetDateTime::now_utc() + state.jwt_expiration_time;
    encode(
        &Header::default(),
        &AuthClaims {
            id,
            role: role.as_str().to_owned(),
            exp: expires_at.unix_timestamp(),
        },
        &state.jwt_encoding_key,
    )
}

type SharedAppState = Arc<AppState>;

struct AppState {
    db_client: db::Client,

    jwt_expiration_time: Duration,

    jwt_decoding_key: DecodingKey,

    jwt_encoding_key: EncodingKey,

    student_email_domain: String,
}

/// JWT claims of an authenticated caller.
///
/// The role is kept as a plain string so tokens carrying an unrecognized
/// role still decode and reach the role checks, which reject them
/// explicitly.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AuthClaims {
    id: i32,
    role: String,
    exp: i64,
}

#[async_trait]
impl FromRequestParts<SharedAppState> for AuthClaims {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut request::Parts,
        state: &SharedAppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AuthError::MissingToken)?;
        let token_data = decode::<Self>(
            bearer.token(),
            &state.jwt_decoding_key,
            &Validation::default(),
        )
        .map_err(|_| AuthError::InvalidToken)?;

        Ok(token_data.claims)
    }
}

#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::MissingToken => error_response(
                StatusCode::UNAUTHORIZED,
                "Unauthorized: No token provided",
            ),
            Self::InvalidToken => error_response(
                StatusCode::UNAUTHORIZED,
                "Invalid or expired token",
            ),
        }
    }
}
