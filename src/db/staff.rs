use std::error::Error as StdError;

use derive_more::Display;
use serde::{Deserialize, Serialize};
use tokio_postgres::{
    types::{
        accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql,
        Type,
    },
    Error,
};

use crate::access::Role;

use super::{student::PasswordHash, Client};

#[derive(Clone, Debug)]
pub struct Staff {
    pub id: Id,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub password_hash: PasswordHash,
}

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    Hash,
    PartialEq,
    Serialize,
)]
pub struct Id(i32);

impl From<i32> for Id {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl From<Id> for i32 {
    fn from(id: Id) -> Self {
        id.0
    }
}

impl FromSql<'_> for Id {
    accepts!(INT4);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        i32::from_sql(ty, raw).map(Self)
    }
}

impl ToSql for Id {
    accepts!(INT4);

    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.0.to_sql(ty, out)
    }
}

impl Client {
    pub async fn add_staff(
        &self,
        name: String,
        email: String,
        password_hash: PasswordHash,
    ) -> Result<Staff, Error> {
        const SQL: &str = "\
            INSERT INTO staff (name, email, role, password_hash) \
            VALUES ($1, $2, $3, $4) \
            RETURNING id";

        let role = Role::Staff;
        let row = self
            .0
            .query_one(SQL, &[&name, &email, &role, &password_hash])
            .await?;

        Ok(Staff {
            id: row.get("id"),
            name,
            email,
            role,
            password_hash,
        })
    }

    pub async fn get_staff_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Staff>, Error> {
        const SQL: &str = "\
            SELECT id, name, email, role, password_hash \
            FROM staff \
            WHERE email = $1 \
            LIMIT 1";
        Ok(self.0.query_opt(SQL, &[&email]).await?.map(|row| Staff {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            role: row.get("role"),
            password_hash: row.get("password_hash"),
        }))
    }
}
