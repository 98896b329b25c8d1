use crate::application::engine::MarketplaceEngine;
use crate::domain::UserId;
use crate::domain::user::UserRole;
use crate::error::{EngineError, Result};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Register,
    TopUp,
    PostJob,
    CancelJob,
    CloseJob,
    SubmitProposal,
    AcceptProposal,
    RejectProposal,
    WithdrawProposal,
    CompleteProposal,
    SendJobRequest,
    AcceptJobRequest,
    DeclineJobRequest,
    CancelJobRequest,
    UpdateProgress,
    CompleteProject,
    HoldProject,
    ResumeProject,
    CancelProject,
    ReleasePayment,
    RequestWithdrawal,
    StartWithdrawalProcessing,
    CompleteWithdrawal,
    FailWithdrawal,
    CancelWithdrawal,
}

/// One row of a command script.
///
/// `subject` is the id the command acts on, except for `register` (the role)
/// and `send_job_request` (the developer). `note` carries free text: a name,
/// title, cover letter or payout method.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct Command {
    pub command: CommandKind,
    pub actor: Option<UserId>,
    pub subject: Option<String>,
    pub amount: Option<Decimal>,
    pub note: Option<String>,
}

impl Command {
    /// Runs the command against `engine`.
    pub async fn execute(&self, engine: &MarketplaceEngine) -> Result<()> {
        use CommandKind::*;

        match self.command {
            Register => {
                engine.open_account(self.note(), self.role()?).await?;
            }
            TopUp => {
                engine.top_up(self.actor()?, self.amount()?).await?;
            }
            PostJob => {
                engine
                    .post_job(self.actor()?, self.note(), self.amount()?)
                    .await?;
            }
            CancelJob => {
                engine.cancel_job(self.subject_id()?, self.actor()?).await?;
            }
            CloseJob => {
                engine.close_job(self.subject_id()?, self.actor()?).await?;
            }
            SubmitProposal => {
                engine
                    .submit_proposal(
                        self.subject_id()?,
                        self.actor()?,
                        self.amount()?,
                        self.note(),
                    )
                    .await?;
            }
            AcceptProposal => {
                engine
                    .accept_proposal(self.subject_id()?, self.actor()?)
                    .await?;
            }
            RejectProposal => {
                engine
                    .reject_proposal(self.subject_id()?, self.actor()?)
                    .await?;
            }
            WithdrawProposal => {
                engine
                    .withdraw_proposal(self.subject_id()?, self.actor()?)
                    .await?;
            }
            CompleteProposal => {
                engine
                    .complete_proposal(self.subject_id()?, self.actor()?)
                    .await?;
            }
            SendJobRequest => {
                engine
                    .send_job_request(
                        self.actor()?,
                        self.subject_id()?,
                        self.note(),
                        self.amount()?,
                    )
                    .await?;
            }
            AcceptJobRequest => {
                engine
                    .accept_job_request(self.subject_id()?, self.actor()?)
                    .await?;
            }
            DeclineJobRequest => {
                engine
                    .decline_job_request(self.subject_id()?, self.actor()?)
                    .await?;
            }
            CancelJobRequest => {
                engine
                    .cancel_job_request(self.subject_id()?, self.actor()?)
                    .await?;
            }
            UpdateProgress => {
                let amount = self.amount()?;
                let progress = amount.trunc().to_i64().ok_or_else(|| {
                    EngineError::InvalidCommand(format!("progress {amount} out of range"))
                })?;
                engine
                    .update_progress(self.subject_id()?, self.actor()?, progress)
                    .await?;
            }
            CompleteProject => {
                engine
                    .complete_project(self.subject_id()?, self.actor()?)
                    .await?;
            }
            HoldProject => {
                engine.hold_project(self.subject_id()?, self.actor()?).await?;
            }
            ResumeProject => {
                engine
                    .resume_project(self.subject_id()?, self.actor()?)
                    .await?;
            }
            CancelProject => {
                engine
                    .cancel_project(self.subject_id()?, self.actor()?)
                    .await?;
            }
            ReleasePayment => {
                engine
                    .release_payment(self.subject_id()?, self.actor()?)
                    .await?;
            }
            RequestWithdrawal => {
                engine
                    .request_withdrawal(self.actor()?, self.amount()?, self.note())
                    .await?;
            }
            StartWithdrawalProcessing => {
                engine
                    .start_withdrawal_processing(self.subject_id()?, self.actor()?)
                    .await?;
            }
            CompleteWithdrawal => {
                engine
                    .complete_withdrawal(self.subject_id()?, self.actor()?)
                    .await?;
            }
            FailWithdrawal => {
                engine
                    .fail_withdrawal(self.subject_id()?, self.actor()?)
                    .await?;
            }
            CancelWithdrawal => {
                engine
                    .cancel_withdrawal(self.subject_id()?, self.actor()?)
                    .await?;
            }
        }
        Ok(())
    }

    fn actor(&self) -> Result<UserId> {
        self.actor.ok_or_else(|| self.missing("actor"))
    }

    fn amount(&self) -> Result<Decimal> {
        self.amount.ok_or_else(|| self.missing("amount"))
    }

    fn subject(&self) -> Result<&str> {
        self.subject
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| self.missing("subject"))
    }

    fn subject_id(&self) -> Result<u64> {
        let subject = self.subject()?;
        subject.parse().map_err(|_| {
            EngineError::InvalidCommand(format!(
                "{:?} expects a numeric subject, got {subject:?}",
                self.command
            ))
        })
    }

    fn role(&self) -> Result<UserRole> {
        match self.subject()? {
            "client" => Ok(UserRole::Client),
            "developer" => Ok(UserRole::Developer),
            "admin" => Ok(UserRole::Admin),
            other => Err(EngineError::InvalidCommand(format!("unknown role {other:?}"))),
        }
    }

    fn note(&self) -> &str {
        self.note.as_deref().unwrap_or_default()
    }

    fn missing(&self, field: &str) -> EngineError {
        EngineError::InvalidCommand(format!("{:?} requires {field}", self.command))
    }
}

/// Reads commands from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over `Result<Command>`.
/// It trims whitespace and accepts rows with trailing columns left out.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads and deserializes commands, one per row.
    pub fn commands(self) -> impl Iterator<Item = Result<Command>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(EngineError::from))
    }
}
