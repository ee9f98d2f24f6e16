use std::{collections::HashMap, error::Error as StdError};

use argon2::{
    password_hash::{
        self, rand_core::OsRng, PasswordHasher as _, PasswordVerifier as _,
        SaltString,
    },
    Argon2,
};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use tokio_postgres::{
    types::{
        accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql,
        Type,
    },
    Error,
};

use super::Client;

#[derive(Clone, Debug)]
pub struct Student {
    pub id: Id,
    pub name: String,
    pub email: String,
    pub gender: String,
    pub bag_number: String,
    pub password_hash: PasswordHash,
}

/// Fields of a [`Student`] row before the database has assigned an id.
#[derive(Clone, Debug)]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    pub gender: String,
    pub bag_number: String,
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

/// Argon2 hash of an account password in PHC string format.
#[derive(Clone, Debug)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn new(secret: &str) -> Result<Self, password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| Self(hash.to_string()))
    }

    pub fn verify(&self, secret: &str) -> bool {
        password_hash::PasswordHash::new(&self.0)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(secret.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }
}

impl FromSql<'_> for PasswordHash {
    accepts!(TEXT);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        String::from_sql(ty, raw).map(Self)
    }
}

impl ToSql for PasswordHash {
    accepts!(TEXT);

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
    pub async fn add_student(
        &self,
        student: NewStudent,
    ) -> Result<Student, Error> {
        const SQL: &str = "\
            INSERT INTO students (name, email, gender, bag_number, \
                                  password_hash) \
            VALUES ($1, $2, $3, $4, $5) \
            RETURNING id";

        let row = self
            .0
            .query_one(
                SQL,
                &[
                    &student.name,
                    &student.email,
                    &student.gender,
                    &student.bag_number,
                    &student.password_hash,
                ],
            )
            .await?;

        Ok(Student {
            id: row.get("id"),
            name: student.name,
            email: student.email,
            gender: student.gender,
            bag_number: student.bag_number,
            password_hash: student.password_hash,
        })
    }

    pub async fn get_student_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Student>, Error> {
        const SQL: &str = "\
            SELECT id, name, email, gender, bag_number, password_hash \
            FROM students \
            WHERE email = $1 \
            LIMIT 1";
        Ok(self.0.query_opt(SQL, &[&email]).await?.map(|row| Student {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            gender: row.get("gender"),
            bag_number: row.get("bag_number"),
            password_hash: row.get("password_hash"),
        }))
    }

    pub async fn get_student_by_id(
        &self,
        id: Id,
    ) -> Result<Option<Student>, Error> {
        const SQL: &str = "\
            SELECT id, name, email, gender, bag_number, password_hash \
            FROM students \
            WHERE id = $1 \
            LIMIT 1";
        Ok(self.0.query_opt(SQL, &[&id]).await?.map(|row| Student {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            gender: row.get("gender"),
            bag_number: row.get("bag_number"),
            password_hash: row.get("password_hash"),
        }))
    }

    pub async fn get_students_by_ids(
        &self,
        ids: &[Id],
    ) -> Result<HashMap<Id, Student>, Error> {
        const SQL: &str = "\
            SELECT id, name, email, gender, bag_number, password_hash \
            FROM students \
            WHERE id IN (SELECT unnest($1::INT4[])) \
            LIMIT $2";

        let limit = i64::try_from(ids.len()).unwrap();

        Ok(self
            .0
            .query(SQL, &[&ids, &limit])
            .await?
            .into_iter()
            .map(|row| {
                let id = row.get("id");
                let student = Student {
                    id,
                    name: row.get("name"),
                    email: row.get("email"),
                    gender: row.get("gender"),
                    bag_number: row.get("bag_number"),
                    password_hash: row.get("password_hash"),
                };
                (id, student)
            })
            .collect())
    }
}
