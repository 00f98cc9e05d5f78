use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use log::{debug, warn};

use loanbook_core::loans::{
    Draw, DrawStatus, LoanError, LoanFacility, LoanRepositoryTrait, Payment, PaymentStatus,
};
use loanbook_core::Result;

use super::model::{DrawDB, LoanFacilityDB, PaymentDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{loan_draws, loan_facilities, loan_payments};

/// Diesel-backed store for facilities and their draws and payments.
///
/// Reads go through the pool; every write is serialized through the writer
/// actor, so each multi-row change commits in a single transaction.
pub struct LoanRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

fn load_loan(conn: &mut SqliteConnection, loan_id: &str) -> Result<LoanFacility> {
    loan_facilities::table
        .find(loan_id)
        .select(LoanFacilityDB::as_select())
        .first::<LoanFacilityDB>(conn)
        .optional()
        .map_err(StorageError::from)?
        .ok_or_else(|| LoanError::loan_not_found(loan_id))?
        .try_into()
}

fn load_draw(conn: &mut SqliteConnection, draw_id: &str) -> Result<Draw> {
    loan_draws::table
        .find(draw_id)
        .select(DrawDB::as_select())
        .first::<DrawDB>(conn)
        .optional()
        .map_err(StorageError::from)?
        .ok_or_else(|| LoanError::draw_not_found(draw_id))?
        .try_into()
}

fn load_payments(conn: &mut SqliteConnection, loan_id: &str) -> Result<Vec<Payment>> {
    loan_payments::table
        .filter(loan_payments::loan_id.eq(loan_id))
        .order(loan_payments::payment_number.asc())
        .select(PaymentDB::as_select())
        .load::<PaymentDB>(conn)
        .map_err(StorageError::from)?
        .into_iter()
        .map(Payment::try_from)
        .collect()
}

fn write_loan(conn: &mut SqliteConnection, loan: LoanFacility) -> Result<LoanFacility> {
    let loan_id = loan.id.clone();
    let loan_db = LoanFacilityDB::try_from(loan)?;
    let updated = diesel::update(loan_facilities::table.find(&loan_id))
        .set(&loan_db)
        .execute(conn)
        .map_err(StorageError::from)?;
    if updated == 0 {
        return Err(LoanError::loan_not_found(loan_id).into());
    }
    load_loan(conn, &loan_id)
}

fn write_draw(conn: &mut SqliteConnection, draw: Draw) -> Result<Draw> {
    let draw_id = draw.id.clone();
    let draw_db = DrawDB::try_from(draw)?;
    let updated = diesel::update(loan_draws::table.find(&draw_id))
        .set(&draw_db)
        .execute(conn)
        .map_err(StorageError::from)?;
    if updated == 0 {
        return Err(LoanError::draw_not_found(draw_id).into());
    }
    load_draw(conn, &draw_id)
}

fn replace_scheduled(
    conn: &mut SqliteConnection,
    loan_id: &str,
    payments: Vec<Payment>,
) -> Result<Vec<Payment>> {
    let removed = diesel::delete(
        loan_payments::table
            .filter(loan_payments::loan_id.eq(loan_id))
            .filter(loan_payments::status.eq(PaymentStatus::Scheduled.as_str())),
    )
    .execute(conn)
    .map_err(StorageError::from)?;

    let rows = payments
        .into_iter()
        .map(PaymentDB::try_from)
        .collect::<Result<Vec<_>>>()?;
    let inserted = diesel::insert_into(loan_payments::table)
        .values(&rows)
        .execute(conn)
        .map_err(StorageError::from)?;
    debug!(
        "Replaced {} scheduled payments with {} for loan {}",
        removed, inserted, loan_id
    );

    load_payments(conn, loan_id)
}

impl LoanRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        LoanRepository { pool, writer }
    }
}

#[async_trait]
impl LoanRepositoryTrait for LoanRepository {
    fn get_loan(&self, loan_id: &str) -> Result<LoanFacility> {
        let mut conn = get_connection(&self.pool)?;
        load_loan(&mut conn, loan_id)
    }

    fn list_loans(&self, project_id: Option<&str>) -> Result<Vec<LoanFacility>> {
        let mut conn = get_connection(&self.pool)?;
        let mut query = loan_facilities::table
            .select(LoanFacilityDB::as_select())
            .order(loan_facilities::created_at.asc())
            .into_boxed();
        if let Some(project_id) = project_id {
            query = query.filter(loan_facilities::project_id.eq(project_id.to_string()));
        }
        query
            .load::<LoanFacilityDB>(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .map(LoanFacility::try_from)
            .collect()
    }

    async fn insert_loan(&self, loan: LoanFacility) -> Result<LoanFacility> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<LoanFacility> {
                let loan_db = LoanFacilityDB::try_from(loan)?;
                let result_db = diesel::insert_into(loan_facilities::table)
                    .values(&loan_db)
                    .returning(LoanFacilityDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                LoanFacility::try_from(result_db)
            })
            .await
    }

    async fn update_loan(&self, loan: LoanFacility) -> Result<LoanFacility> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| write_loan(conn, loan))
            .await
    }

    async fn delete_loan(&self, loan_id: &str) -> Result<usize> {
        let loan_id = loan_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                // Draws and payments go with the facility via ON DELETE CASCADE.
                Ok(diesel::delete(loan_facilities::table.find(loan_id))
                    .execute(conn)
                    .map_err(StorageError::from)?)
            })
            .await
    }

    fn get_draw(&self, draw_id: &str) -> Result<Draw> {
        let mut conn = get_connection(&self.pool)?;
        load_draw(&mut conn, draw_id)
    }

    fn list_draws(&self, loan_id: &str) -> Result<Vec<Draw>> {
        let mut conn = get_connection(&self.pool)?;
        loan_draws::table
            .filter(loan_draws::loan_id.eq(loan_id))
            .order(loan_draws::draw_number.asc())
            .select(DrawDB::as_select())
            .load::<DrawDB>(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .map(Draw::try_from)
            .collect()
    }

    async fn insert_draw(&self, draw: Draw, loan: LoanFacility) -> Result<Draw> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Draw> {
                // The facility carries the bumped draw sequence.
                write_loan(conn, loan)?;
                let draw_db = DrawDB::try_from(draw)?;
                let result_db = diesel::insert_into(loan_draws::table)
                    .values(&draw_db)
                    .returning(DrawDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                Draw::try_from(result_db)
            })
            .await
    }

    async fn update_draw(&self, draw: Draw) -> Result<Draw> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| write_draw(conn, draw))
            .await
    }

    async fn delete_draw(&self, draw_id: &str) -> Result<usize> {
        let draw_id = draw_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                Ok(diesel::delete(
                    loan_draws::table
                        .find(draw_id)
                        .filter(loan_draws::status.ne(DrawStatus::Funded.as_str())),
                )
                .execute(conn)
                .map_err(StorageError::from)?)
            })
            .await
    }

    async fn save_funded_draw(
        &self,
        draw: Draw,
        mut loan: LoanFacility,
    ) -> Result<(Draw, LoanFacility)> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<(Draw, LoanFacility)> {
                // Re-check against the committed rows inside the write transaction.
                let stored_loan = load_loan(conn, &loan.id)?;
                let stored_draw = load_draw(conn, &draw.id)?;
                if stored_draw.status != DrawStatus::Approved {
                    return Err(LoanError::InvalidDrawState(format!(
                        "draw {} is {}, only APPROVED draws can be funded",
                        stored_draw.id,
                        stored_draw.status.as_str()
                    ))
                    .into());
                }
                let funded = stored_loan
                    .funded_amount
                    .checked_add(stored_draw.amount)
                    .filter(|funded| *funded <= stored_loan.commitment_amount);
                let Some(funded) = funded else {
                    warn!(
                        "Funding draw {} would overdraw loan {} ({} + {} > {})",
                        stored_draw.id,
                        stored_loan.id,
                        stored_loan.funded_amount,
                        stored_draw.amount,
                        stored_loan.commitment_amount
                    );
                    return Err(LoanError::DrawExceedsCommitment {
                        loan_id: stored_loan.id,
                        amount: stored_draw.amount,
                        funded: stored_loan.funded_amount,
                        commitment: stored_loan.commitment_amount,
                    }
                    .into());
                };
                loan.funded_amount = funded;

                let loan = write_loan(conn, loan)?;
                let draw = write_draw(conn, draw)?;
                debug!(
                    "Persisted funding of draw #{} on loan {}",
                    draw.draw_number, loan.id
                );
                Ok((draw, loan))
            })
            .await
    }

    fn get_payment(&self, payment_id: &str) -> Result<Payment> {
        let mut conn = get_connection(&self.pool)?;
        loan_payments::table
            .find(payment_id)
            .select(PaymentDB::as_select())
            .first::<PaymentDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?
            .ok_or_else(|| LoanError::payment_not_found(payment_id))?
            .try_into()
    }

    fn list_payments(&self, loan_id: &str) -> Result<Vec<Payment>> {
        let mut conn = get_connection(&self.pool)?;
        load_payments(&mut conn, loan_id)
    }

    async fn replace_scheduled_payments(
        &self,
        loan_id: &str,
        payments: Vec<Payment>,
    ) -> Result<Vec<Payment>> {
        let loan_id = loan_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Vec<Payment>> {
                replace_scheduled(conn, &loan_id, payments)
            })
            .await
    }

    async fn update_payment(&self, payment: Payment) -> Result<Payment> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Payment> {
                let payment_id = payment.id.clone();
                let payment_db = PaymentDB::try_from(payment)?;
                let updated = diesel::update(loan_payments::table.find(&payment_id))
                    .set(&payment_db)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                if updated == 0 {
                    return Err(LoanError::payment_not_found(payment_id).into());
                }
                loan_payments::table
                    .find(&payment_id)
                    .select(PaymentDB::as_select())
                    .first::<PaymentDB>(conn)
                    .map_err(StorageError::from)?
                    .try_into()
            })
            .await
    }

    async fn save_activated_loan(
        &self,
        loan: LoanFacility,
        payments: Vec<Payment>,
    ) -> Result<(LoanFacility, Vec<Payment>)> {
        self.writer
            .exec(
                move |conn: &mut SqliteConnection| -> Result<(LoanFacility, Vec<Payment>)> {
                    let loan = write_loan(conn, loan)?;
                    let payments = replace_scheduled(conn, &loan.id, payments)?;
                    Ok((loan, payments))
                },
            )
            .await
    }
}
