//! Non-blocking forms of the repository operations.
//!
//! Each `_async` method runs its blocking counterpart on tokio's blocking
//! pool, so the calling task suspends without tying up an executor thread.
//! Results are exactly those of the blocking call. Must be called from
//! within a tokio runtime.

use crate::document::{Document, Identified};
use crate::error::{RepositoryError, WriteError, WriteOperation};
use crate::filter::Filter;
use crate::identity::Identity;
use crate::paging::PagedResult;

use super::{EntityRepository, IdentityRepository};

async fn run_read<T, F>(call: F) -> Result<T, RepositoryError>
where
    F: FnOnce() -> Result<T, RepositoryError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(call)
        .await
        .map_err(|err| RepositoryError::Interrupted(err.to_string()))?
}

impl<D: Document> EntityRepository<D> {
    pub async fn get_all_async(&self, limit: u64, page: u64) -> Result<Vec<D>, RepositoryError> {
        let repo = self.clone();
        run_read(move || repo.get_all(limit, page)).await
    }

    pub async fn count_async(&self) -> Result<u64, RepositoryError> {
        let repo = self.clone();
        run_read(move || repo.count()).await
    }

    pub async fn count_where_async(&self, filter: Filter) -> Result<u64, RepositoryError> {
        let repo = self.clone();
        run_read(move || repo.count_where(&filter)).await
    }

    pub async fn get_single_async(&self, filter: Filter) -> Result<Option<D>, RepositoryError> {
        let repo = self.clone();
        run_read(move || repo.get_single(&filter)).await
    }

    pub async fn find_by_async(
        &self,
        filter: Filter,
        limit: u64,
        page: u64,
    ) -> Result<Vec<D>, RepositoryError> {
        let repo = self.clone();
        run_read(move || repo.find_by(&filter, limit, page)).await
    }

    pub async fn get_paged_async(
        &self,
        page: u64,
        page_size: u64,
    ) -> Result<PagedResult<D>, RepositoryError> {
        let repo = self.clone();
        run_read(move || repo.get_paged(page, page_size)).await
    }

    pub async fn find_paged_async(
        &self,
        filter: Filter,
        page: u64,
        page_size: u64,
    ) -> Result<PagedResult<D>, RepositoryError> {
        let repo = self.clone();
        run_read(move || repo.find_paged(&filter, page, page_size)).await
    }

    pub async fn delete_where_async(&self, filter: Filter) -> Result<u64, WriteError> {
        let repo = self.clone();
        match tokio::task::spawn_blocking(move || repo.delete_where(&filter)).await {
            Ok(result) => result,
            Err(err) => Err(self.write_failed(
                WriteOperation::DeleteMany,
                WriteError::Interrupted(err.to_string()),
            )),
        }
    }
}

impl<D: Identified> IdentityRepository<D> {
    pub async fn get_async(&self, id: D::Id) -> Result<Option<D>, RepositoryError> {
        let repo = self.clone();
        run_read(move || repo.get(&id)).await
    }

    /// Like [`IdentityRepository::save`]: a newly assigned id is written
    /// back into `entity`.
    pub async fn save_async(&self, entity: &mut D) -> Result<D::Id, WriteError> {
        let repo = self.clone();
        let mut staged = entity.clone();
        let inserting = staged.id().is_unset();

        let outcome = tokio::task::spawn_blocking(move || {
            let result = repo.save(&mut staged);
            (staged, result)
        })
        .await;

        match outcome {
            Ok((staged, result)) => {
                entity.set_id(staged.id());
                result
            }
            Err(err) => {
                let operation = if inserting {
                    WriteOperation::Insert
                } else {
                    WriteOperation::Update
                };
                Err(self.write_failed(operation, WriteError::Interrupted(err.to_string())))
            }
        }
    }

    pub async fn delete_async(&self, entity: &D) -> Result<u64, WriteError> {
        let repo = self.clone();
        let entity = entity.clone();
        match tokio::task::spawn_blocking(move || repo.delete(&entity)).await {
            Ok(result) => result,
            Err(err) => Err(self.write_failed(
                WriteOperation::Delete,
                WriteError::Interrupted(err.to_string()),
            )),
        }
    }
}
