use constcat::concat;
use laundry_tracker::api;
use reqwest::StatusCode;
use serde_json::json;

const BASE_URL: &str = "http://localhost:3000";

/// Domain the running server is configured to accept student e-mails from.
pub const STUDENT_EMAIL_DOMAIN: &str = "rishihood.edu.in";

/// Produces an e-mail address unlikely to collide with earlier test runs.
pub fn unique_email(prefix: &str, domain: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    format!("{prefix}.{nanos}@{domain}")
}

/// Registers and logs in a fresh student with bag number `B-17`.
pub async fn student_client() -> Client {
    let email = unique_email("student", STUDENT_EMAIL_DOMAIN);
    let client = Client::new();
    client
        .register_student("Alice", &email, "password", "B-17", "female")
        .await
        .unwrap();
    client.login_student(&email, "password").await
}

/// Registers and logs in a fresh staff member.
pub async fn staff_client() -> Client {
    let email = unique_email("staff", "laundry.example");
    let client = Client::new();
    client
        .register_staff("Bob", &email, "password")
        .await
        .unwrap();
    client.login_staff(&email, "password").await
}

pub struct Client {
    inner: reqwest::Client,
    pub auth_token: Option<String>,
}

impl Client {
    pub fn new() -> Self {
        Self {
            inner: reqwest::Client::new(),
            auth_token: None,
        }
    }

    pub async fn register_student(
        &self,
        name: &str,
        email: &str,
        password: &str,
        bag_number: &str,
        gender: &str,
    ) -> Result<api::Student, StatusCode> {
        const URL: &str = concat!(BASE_URL, "/auth/student/register");

        Ok(self
            .inner
            .post(URL)
            .json(&json!({
                "name": name,
                "email": email,
                "password": password,
                "bagNumber": bag_number,
                "gender": gender,
            }))
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?
            .json::<api::Student>()
            .await
            .expect("failed to get a response"))
    }

    pub async fn login_student(mut self, email: &str, password: &str) -> Self {
        const URL: &str = concat!(BASE_URL, "/auth/student/login");

        self.auth_token = Some(
            self.inner
                .post(URL)
                .json(&json!({
                    "email": email,
                    "password": password,
                }))
                .send()
                .await
                .expect("failed to send a request")
                .error_for_status()
                .expect("wrong status code")
                .json::<api::AuthToken>()
                .await
                .expect("failed to get a response")
                .token,
        );

        self
    }

    pub async fn register_staff(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<(), StatusCode> {
        const URL: &str = concat!(BASE_URL, "/auth/staff/register");

        self.inner
            .post(URL)
            .json(&json!({
                "name": name,
                "email": email,
                "password": password,
            }))
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?;

        Ok(())
    }

    pub async fn login_staff(mut self, email: &str, password: &str) -> Self {
        const URL: &str = concat!(BASE_URL, "/auth/staff/login");

        self.auth_token = Some(
            self.inner
                .post(URL)
                .json(&json!({
                    "email": email,
                    "password": password,
                }))
                .send()
                .await
                .expect("failed to send a request")
                .error_for_status()
                .expect("wrong status code")
                .json::<api::AuthToken>()
                .await
                .expect("failed to get a response")
                .token,
        );

        self
    }

    pub async fn try_login_student(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(), StatusCode> {
        const URL: &str = concat!(BASE_URL, "/auth/student/login");

        self.inner
            .post(URL)
            .json(&json!({
                "email": email,
                "password": password,
            }))
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?;

        Ok(())
    }

    pub async fn list_laundry(&self) -> Result<Vec<api::Laundry>, StatusCode> {
        const URL: &str = concat!(BASE_URL, "/laundry");

        let mut req = self.inner.get(URL);
        if let Some(token) = &self.auth_token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        Ok(req
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?
            .json::<Vec<api::Laundry>>()
            .await
            .expect("failed to get a response"))
    }

    pub async fn my_laundry(&self) -> Result<Vec<api::Laundry>, StatusCode> {
        const URL: &str = concat!(BASE_URL, "/laundry/my");

        let mut req = self.inner.get(URL);
        if let Some(token) = &self.auth_token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        Ok(req
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?
            .json::<Vec<api::Laundry>>()
            .await
            .expect("failed to get a response"))
    }

    pub async fn add_laundry(
        &self,
        shirts: usize,
        bottoms: usize,
        towels: usize,
        bedsheets: usize,
        others: usize,
    ) -> Result<api::Laundry, StatusCode> {
        const URL: &str = concat!(BASE_URL, "/laundry");

        let mut req = self.inner.post(URL);
        if let Some(token) = &self.auth_token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        Ok(req
            .json(&json!({
                "shirts": shirts,
                "bottoms": bottoms,
                "towels": towels,
                "bedsheets": bedsheets,
                "others": others,
            }))
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?
            .json::<api::Laundry>()
            .await
            .expect("failed to get a response"))
    }

    /// On rejection, returns the status code together with the `message`
    /// field of the error body.
    pub async fn update_status(
        &self,
        id: api::laundry::Id,
        status: &str,
    ) -> Result<api::Laundry, (StatusCode, String)> {
        const URL: &str = concat!(BASE_URL, "/laundry");

        let mut req = self.inner.patch(format!("{URL}/{id}"));
        if let Some(token) = &self.auth_token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        let resp = req
            .json(&json!({
                "status": status,
            }))
            .send()
            .await
            .expect("failed to send a request");

        if resp.status().is_success() {
            Ok(resp
                .json::<api::Laundry>()
                .await
                .expect("failed to get a response"))
        } else {
            let status = resp.status();
            let error = resp
                .json::<api::Error>()
                .await
                .expect("failed to get an error response");
            Err((status, error.message))
        }
    }

    pub async fn update_issue(
        &self,
        id: api::laundry::Id,
        issue: Option<&str>,
    ) -> Result<api::Laundry, StatusCode> {
        const URL: &str = concat!(BASE_URL, "/laundry");

        let mut req = self.inner.patch(format!("{URL}/{id}/issue"));
        if let Some(token) = &self.auth_token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        Ok(req
            .json(&json!({
                "issue": issue,
            }))
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?
            .json::<api::Laundry>()
            .await
            .expect("failed to get a response"))
    }
}
