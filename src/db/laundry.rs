use std::{error::Error as StdError, str::FromStr};

use derive_more::Display;
use enum_utils::TryFromRepr;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio_postgres::{
    types::{
        accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql,
        Type,
    },
    Error,
};

use super::{student, Client};

#[derive(Clone, Debug)]
pub struct Laundry {
    pub id: Id,
    pub student: student::Id,
    pub bag_number: String,
    pub shirts: usize,
    pub bottoms: usize,
    pub towels: usize,
    pub bedsheets: usize,
    pub others: usize,
    pub total_items: usize,
    pub status: Status,
    pub issue: Option<String>,
    pub pickup_date: OffsetDateTime,
    pub delivery_date: Option<OffsetDateTime>,
}

/// Fields of a [`Laundry`] row before the database has assigned an id.
#[derive(Clone, Debug)]
pub struct NewLaundry {
    pub student: student::Id,
    pub bag_number: String,
    pub shirts: usize,
    pub bottoms: usize,
    pub towels: usize,
    pub bedsheets: usize,
    pub others: usize,
    pub total_items: usize,
    pub status: Status,
    pub pickup_date: OffsetDateTime,
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

#[derive(
    Clone, Copy, Debug, Deserialize, Eq, TryFromRepr, PartialEq, Serialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum Status {
    /// Bag is submitted and waiting at the laundry room.
    Pending = 1,

    /// Bag was collected by its owning student.
    PickedUp = 2,

    /// Laundry is washed and ready for pickup.
    Washed = 3,

    /// Bag was handed back to the student by staff.
    Delivered = 4,
}

impl FromStr for Status {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PICKED_UP" => Ok(Self::PickedUp),
            "WASHED" => Ok(Self::Washed),
            "DELIVERED" => Ok(Self::Delivered),
            _ => Err(InvalidStatus),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct InvalidStatus;

impl FromSql<'_> for Status {
    accepts!(INT2);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        let repr = i16::from_sql(ty, raw)?;
        let repr = u8::try_from(repr)?;
        let status = Self::try_from(repr).map_err(|_| "invalid status")?;
        Ok(status)
    }
}

impl ToSql for Status {
    accepts!(INT2);

    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        let repr = i16::from((*self) as u8);
        repr.to_sql(ty, out)
    }
}

impl Client {
    pub async fn add_laundry(
        &self,
        laundry: NewLaundry,
    ) -> Result<Laundry, Error> {
        const SQL: &str = "\
            INSERT INTO laundry (student_id, bag_number, shirts, bottoms, \
                                 towels, bedsheets, others, total_items, \
                                 status, issue, pickup_date, delivery_date) \
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NULL, $10, NULL) \
            RETURNING id";

        let row = self
            .0
            .query_one(
                SQL,
                &[
                    &laundry.student,
                    &laundry.bag_number,
                    &(laundry.shirts as i32),
                    &(laundry.bottoms as i32),
                    &(laundry.towels as i32),
                    &(laundry.bedsheets as i32),
                    &(laundry.others as i32),
                    &(laundry.total_items as i32),
                    &laundry.status,
                    &laundry.pickup_date,
                ],
            )
            .await?;

        Ok(Laundry {
            id: row.get("id"),
            student: laundry.student,
            bag_number: laundry.bag_number,
            shirts: laundry.shirts,
            bottoms: laundry.bottoms,
            towels: laundry.towels,
            bedsheets: laundry.bedsheets,
            others: laundry.others,
            total_items: laundry.total_items,
            status: laundry.status,
            issue: None,
            pickup_date: laundry.pickup_date,
            delivery_date: None,
        })
    }

    pub async fn get_laundry_by_id(
        &self,
        id: Id,
    ) -> Result<Option<Laundry>, Error> {
        const SQL: &str = "\
            SELECT id, student_id, bag_number, shirts, bottoms, towels, \
                   bedsheets, others, total_items, status, issue, \
                   pickup_date, delivery_date \
            FROM laundry \
            WHERE id = $1";
        Ok(self.0.query_opt(SQL, &[&id]).await?.map(from_row))
    }

    /// Persists the mutable part of a ticket: status, issue note and
    /// delivery date. All other fields are fixed at creation.
    pub async fn write_laundry(&self, laundry: &Laundry) -> Result<(), Error> {
        const SQL: &str = "\
            UPDATE laundry \
            SET status = $2, \
                issue = $3, \
                delivery_date = $4 \
            WHERE id = $1";

        self.0
            .execute(
                SQL,
                &[
                    &laundry.id,
                    &laundry.status,
                    &laundry.issue,
                    &laundry.delivery_date,
                ],
            )
            .await
            .map(drop)
    }

    pub async fn get_all_laundry(&self) -> Result<Vec<Laundry>, Error> {
        const SQL: &str = "\
            SELECT id, student_id, bag_number, shirts, bottoms, towels, \
                   bedsheets, others, total_items, status, issue, \
                   pickup_date, delivery_date \
            FROM laundry \
            ORDER BY pickup_date DESC, \
                     id DESC";
        Ok(self
            .0
            .query(SQL, &[])
            .await?
            .into_iter()
            .map(from_row)
            .collect())
    }

    pub async fn get_laundry_by_student(
        &self,
        student: student::Id,
    ) -> Result<Vec<Laundry>, Error> {
        const SQL: &str = "\
            SELECT id, student_id, bag_number, shirts, bottoms, towels, \
                   bedsheets, others, total_items, status, issue, \
                   pickup_date, delivery_date \
            FROM laundry \
            WHERE student_id = $1 \
            ORDER BY pickup_date DESC, \
                     id DESC";
        Ok(self
            .0
            .query(SQL, &[&student])
            .await?
            .into_iter()
            .map(from_row)
            .collect())
    }
}

fn from_row(row: tokio_postgres::Row) -> Laundry {
    Laundry {
        id: row.get("id"),
        student: row.get("student_id"),
        bag_number: row.get("bag_number"),
        shirts: usize::try_from(row.get::<_, i32>("shirts")).unwrap(),
        bottoms: usize::try_from(row.get::<_, i32>("bottoms")).unwrap(),
        towels: usize::try_from(row.get::<_, i32>("towels")).unwrap(),
        bedsheets: usize::try_from(row.get::<_, i32>("bedsheets")).unwrap(),
        others: usize::try_from(row.get::<_, i32>("others")).unwrap(),
        total_items: usize::try_from(row.get::<_, i32>("total_items"))
            .unwrap(),
        status: row.get("status"),
        issue: row.get("issue"),
        pickup_date: row.get("pickup_date"),
        delivery_date: row.get("delivery_date"),
    }
}
