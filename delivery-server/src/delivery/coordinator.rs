//! DeliveryCoordinator: 配送编排
//!
//! 把生命周期判定、配送码生成、位置广播和积分账本串起来。
//! 每个状态迁移在 writer 连接上的单个事务里完成：
//!
//! ```text
//! accept  : 校验 → EMR 快照(事务外) → [生成配送码 + INSERT delivery] → commit
//! start   : [读状态 → CAS accepted→in_progress] → commit
//! cancel  : [读状态 → CAS in_progress→canceled] → commit
//! redeem  : [按码查找 → 解析等级 → CAS in_progress→delivered + INSERT feedback] → commit
//!           → 晋级（独立事务，失败只记日志，可手动重算）
//! ```

use std::sync::Arc;

use shared::live::PositionUpdate;
use shared::models::{
    CompletedDelivery, Coordinates, Delivery, DeliveryStatus, DeliverySummary, Feedback, Order,
    OrderCreate, OrderDetail, OrderState, PromotionOutcome, RedeemCode,
};
use shared::util::{now_millis, snowflake_id};
use sqlx::SqliteConnection;

use crate::auth::{CurrentUser, Role};
use crate::db::DbService;
use crate::db::repository::{self, RepoError, delivery as delivery_repo, order as order_repo};
use crate::emr::{EmrError, PrescriptionSource};
use crate::live::{LocationHub, Subscription};
use crate::loyalty::EnrollmentResolver;

use super::code::CodeGenerator;
use super::error::{DeliveryError, DeliveryResult};
use super::lifecycle::{self, LifecycleError, Step, Transition};

/// 未认领订单列表的上限
const UNCLAIMED_LIMIT: i64 = 100;

#[derive(Clone)]
pub struct DeliveryCoordinator {
    db: DbService,
    hub: LocationHub,
    resolver: EnrollmentResolver,
    emr: Arc<dyn PrescriptionSource>,
    codes: CodeGenerator,
}

impl DeliveryCoordinator {
    pub fn new(
        db: DbService,
        hub: LocationHub,
        resolver: EnrollmentResolver,
        emr: Arc<dyn PrescriptionSource>,
        codes: CodeGenerator,
    ) -> Self {
        Self {
            db,
            hub,
            resolver,
            emr,
            codes,
        }
    }

    pub fn hub(&self) -> &LocationHub {
        &self.hub
    }

    // ========== 订单 ==========

    pub async fn create_order(&self, patient_id: i64, data: OrderCreate) -> DeliveryResult<Order> {
        let destination = Coordinates::new(data.latitude, data.longitude);
        ensure_valid(destination)?;
        if data.address.trim().is_empty() {
            return Err(DeliveryError::MissingAddress);
        }

        let order =
            order_repo::create(&self.db.writer, snowflake_id(), patient_id, &data, now_millis())
                .await?;
        tracing::info!(order_id = order.id, patient_id, "Delivery order created");
        Ok(order)
    }

    /// 患者看自己的订单，配送员看自己接的单
    pub async fn orders_for(&self, user: &CurrentUser) -> DeliveryResult<Vec<OrderDetail>> {
        let pool = &self.db.pool;
        match user.role {
            Role::Patient => {
                let orders = order_repo::find_by_patient(pool, user.id).await?;
                let mut details = Vec::with_capacity(orders.len());
                for order in orders {
                    let delivery = delivery_repo::find_by_order(pool, order.id).await?;
                    details.push(build_detail(order, delivery));
                }
                Ok(details)
            }
            Role::Agent => {
                let deliveries = delivery_repo::find_by_agent(pool, user.id).await?;
                let mut details = Vec::with_capacity(deliveries.len());
                for delivery in deliveries {
                    if let Some(order) = order_repo::find_by_id(pool, delivery.order_id).await? {
                        details.push(build_detail(order, Some(delivery)));
                    }
                }
                Ok(details)
            }
            Role::Staff => Ok(Vec::new()),
        }
    }

    pub async fn order_detail(
        &self,
        viewer: &CurrentUser,
        order_id: i64,
    ) -> DeliveryResult<OrderDetail> {
        let pool = &self.db.pool;
        let order = order_repo::find_by_id(pool, order_id)
            .await?
            .ok_or(DeliveryError::OrderNotFound(order_id))?;
        let delivery = delivery_repo::find_by_order(pool, order_id).await?;

        let allowed = match (&delivery, viewer.role) {
            (_, Role::Staff) => true,
            (_, Role::Patient) => order.patient_id == viewer.id,
            (Some(d), Role::Agent) => d.agent_id == viewer.id,
            // 未认领的订单对已审核配送员可见
            (None, Role::Agent) => viewer.approved,
        };
        if !allowed {
            return Err(DeliveryError::NotParticipant(order_id));
        }
        Ok(build_detail(order, delivery))
    }

    /// 可认领订单（尚无配送单）
    pub async fn list_unclaimed(&self, delivery_mode: Option<&str>) -> DeliveryResult<Vec<Order>> {
        Ok(order_repo::find_unclaimed(&self.db.pool, delivery_mode, UNCLAIMED_LIMIT).await?)
    }

    // ========== 生命周期迁移 ==========

    /// Requested → Accepted
    ///
    /// 并发接同一订单时只有一个成功，其余返回 `AlreadyAccepted`；
    /// `delivery.order_id` 唯一约束是最终判定。
    pub async fn accept(&self, agent_id: i64, order_id: i64) -> DeliveryResult<Delivery> {
        let order = order_repo::find_by_id(&self.db.pool, order_id)
            .await?
            .ok_or(DeliveryError::OrderNotFound(order_id))?;
        let existing = delivery_repo::find_by_order(&self.db.pool, order_id).await?;
        lifecycle::apply(state_of(existing.as_ref()), Transition::Accept)?;

        // EMR 调用不占写连接
        let prescription = self
            .emr
            .current_prescription(order.patient_id)
            .await
            .inspect_err(|e| {
                tracing::warn!(order_id, patient_id = order.patient_id, error = %e, "Prescription lookup failed");
            })?;
        let instruction = prescription.as_ref().and_then(|p| p.instruction.clone());
        let prescription = prescription
            .map(|p| serde_json::to_string(&p))
            .transpose()
            .map_err(|e| EmrError::InvalidResponse(e.to_string()))?;

        let now = now_millis();
        let mut tx = self.db.writer.begin().await?;
        let code = self.codes.generate(&mut *tx).await?;
        let new = delivery_repo::NewDelivery {
            id: snowflake_id(),
            order_id,
            patient_id: order.patient_id,
            agent_id,
            code,
            prescription,
            instruction,
            created_at: now,
        };
        let delivery = match delivery_repo::insert(&mut *tx, &new).await {
            Ok(d) => d,
            Err(RepoError::Duplicate(msg)) => {
                // 约束失败只回滚该语句，事务内可以重读
                let winner = delivery_repo::find_by_order(&mut *tx, order_id).await?;
                return Err(insert_conflict(order_id, agent_id, winner.as_ref(), msg));
            }
            Err(e) => return Err(e.into()),
        };
        tx.commit().await?;

        tracing::info!(
            order_id,
            delivery_id = delivery.id,
            agent_id,
            "Order accepted"
        );
        Ok(delivery)
    }

    pub async fn delivery_detail(
        &self,
        viewer: &CurrentUser,
        delivery_id: i64,
    ) -> DeliveryResult<Delivery> {
        let delivery = delivery_repo::find_by_id(&self.db.pool, delivery_id)
            .await?
            .ok_or(DeliveryError::DeliveryNotFound(delivery_id))?;
        ensure_participant(viewer, &delivery)?;
        Ok(delivery)
    }

    /// Accepted → InProgress（已开始时幂等返回）
    pub async fn start(
        &self,
        agent_id: i64,
        delivery_id: i64,
        position: Coordinates,
    ) -> DeliveryResult<Delivery> {
        ensure_valid(position)?;
        let now = now_millis();
        let mut tx = self.db.writer.begin().await?;
        let delivery = load_assigned(&mut *tx, delivery_id, agent_id).await?;

        let delivery = match lifecycle::apply(state_of(Some(&delivery)), Transition::Start)? {
            Step::Unchanged => delivery,
            Step::Advance(_) => {
                let touched = delivery_repo::mark_started(&mut *tx, delivery_id, position, now).await?;
                if touched == 0 {
                    reevaluate(&mut *tx, delivery_id, Transition::Start).await?
                } else {
                    load(&mut *tx, delivery_id).await?
                }
            }
        };
        tx.commit().await?;

        tracing::info!(delivery_id, agent_id, "Delivery started");
        Ok(delivery)
    }

    /// InProgress → Canceled（终态上 no-op）
    pub async fn cancel(&self, agent_id: i64, delivery_id: i64) -> DeliveryResult<Delivery> {
        let now = now_millis();
        let mut tx = self.db.writer.begin().await?;
        let delivery = load_assigned(&mut *tx, delivery_id, agent_id).await?;

        let delivery = match lifecycle::apply(state_of(Some(&delivery)), Transition::Cancel)? {
            Step::Unchanged => delivery,
            Step::Advance(_) => {
                let touched = delivery_repo::set_status(
                    &mut *tx,
                    delivery_id,
                    DeliveryStatus::InProgress,
                    DeliveryStatus::Canceled,
                    now,
                )
                .await?;
                if touched == 0 {
                    reevaluate(&mut *tx, delivery_id, Transition::Cancel).await?
                } else {
                    tracing::info!(delivery_id, agent_id, "Delivery canceled");
                    load(&mut *tx, delivery_id).await?
                }
            }
        };
        tx.commit().await?;
        Ok(delivery)
    }

    /// InProgress → Delivered
    ///
    /// 配送码单次有效。Feedback 与状态在同一事务提交，晋级在提交之后单独执行。
    pub async fn redeem_code(
        &self,
        patient_id: i64,
        req: RedeemCode,
    ) -> DeliveryResult<CompletedDelivery> {
        if !(1..=5).contains(&req.rating) {
            return Err(DeliveryError::InvalidRating(req.rating));
        }
        let code = req.code.trim();
        if code.is_empty() {
            return Err(DeliveryError::CodeNotFound);
        }

        let now = now_millis();
        let mut tx = self.db.writer.begin().await?;
        let delivery = delivery_repo::find_by_code(&mut *tx, code)
            .await?
            .ok_or(DeliveryError::CodeNotFound)?;
        if delivery.patient_id != patient_id {
            tracing::warn!(delivery_id = delivery.id, patient_id, "Code presented by another patient");
            return Err(DeliveryError::CodeNotOwned);
        }
        lifecycle::apply(state_of(Some(&delivery)), Transition::Redeem)?;

        let points = EnrollmentResolver::resolve_current(&mut *tx, patient_id, now)
            .await?
            .map(|c| c.program.unit_point)
            .unwrap_or(0);

        let touched = delivery_repo::set_status(
            &mut *tx,
            delivery.id,
            DeliveryStatus::InProgress,
            DeliveryStatus::Delivered,
            now,
        )
        .await?;
        if touched == 0 {
            reevaluate(&mut *tx, delivery.id, Transition::Redeem).await?;
            return Err(DeliveryError::CodeAlreadyUsed);
        }

        let feedback = Feedback {
            id: snowflake_id(),
            delivery_id: delivery.id,
            patient_id,
            review: req.review,
            rating: req.rating,
            points_awarded: points,
            created_at: now,
        };
        match repository::feedback::insert(&mut *tx, &feedback).await {
            Ok(()) => {}
            Err(RepoError::Duplicate(_)) => return Err(DeliveryError::CodeAlreadyUsed),
            Err(e) => return Err(e.into()),
        }
        tx.commit().await?;

        tracing::info!(
            delivery_id = delivery.id,
            patient_id,
            points_awarded = points,
            "Delivery completed"
        );

        let promotion = match self.resolver.advance_tier(patient_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    patient_id,
                    delivery_id = delivery.id,
                    error = %e,
                    "Tier advancement failed after delivery completion"
                );
                PromotionOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        Ok(CompletedDelivery {
            feedback,
            promotion,
        })
    }

    // ========== 实时位置 ==========

    /// 配送员上报位置：更新最新位置并广播
    pub async fn publish_position(
        &self,
        agent_id: i64,
        delivery_id: i64,
        position: Coordinates,
    ) -> DeliveryResult<PositionUpdate> {
        ensure_valid(position)?;
        let delivery = delivery_repo::find_by_id(&self.db.pool, delivery_id)
            .await?
            .ok_or(DeliveryError::DeliveryNotFound(delivery_id))?;
        if delivery.agent_id != agent_id {
            return Err(DeliveryError::NotAssignedAgent(delivery_id));
        }

        let now = now_millis();
        let touched =
            delivery_repo::update_position(&self.db.writer, delivery_id, position, now).await?;
        if touched == 0 {
            return Err(LifecycleError::NotInProgress.into());
        }

        let update = PositionUpdate {
            delivery_id,
            coordinates: position,
            at: now,
        };
        let receivers = self.hub.publish(update);
        tracing::trace!(delivery_id, receivers, "Position published");
        Ok(update)
    }

    /// 订阅配送位置，返回订阅句柄和当前已存位置
    pub async fn join_stream(
        &self,
        viewer: &CurrentUser,
        delivery_id: i64,
    ) -> DeliveryResult<(Subscription, Option<Coordinates>)> {
        let delivery = delivery_repo::find_by_id(&self.db.pool, delivery_id)
            .await?
            .ok_or(DeliveryError::DeliveryNotFound(delivery_id))?;
        ensure_participant(viewer, &delivery)?;
        if delivery.status != DeliveryStatus::InProgress {
            return Err(LifecycleError::NotInProgress.into());
        }

        // 先订阅再读位置，避免两者之间的更新丢失
        let subscription = self.hub.join(delivery_id);
        let position = delivery_repo::find_by_id(&self.db.pool, delivery_id)
            .await?
            .and_then(|d| d.position());
        Ok((subscription, position))
    }

    /// 最新已存位置（订阅落后时补发）
    pub async fn stored_position(&self, delivery_id: i64) -> DeliveryResult<Option<Coordinates>> {
        Ok(delivery_repo::find_by_id(&self.db.pool, delivery_id)
            .await?
            .and_then(|d| d.position()))
    }
}

/// 插入配送单时的唯一约束冲突：订单已有配送单才算输掉接单竞争，
/// 其余（主键撞号等）按存储错误上报
fn insert_conflict(
    order_id: i64,
    agent_id: i64,
    winner: Option<&Delivery>,
    msg: String,
) -> DeliveryError {
    match winner {
        Some(d) => {
            tracing::info!(order_id, agent_id, winner = d.agent_id, "Lost acceptance race");
            LifecycleError::AlreadyAccepted.into()
        }
        None => {
            tracing::error!(
                order_id,
                agent_id,
                error = %msg,
                "Delivery insert rejected by a unique constraint"
            );
            RepoError::Database(format!("delivery insert rejected: {msg}")).into()
        }
    }
}

fn state_of(delivery: Option<&Delivery>) -> OrderState {
    OrderState::from(delivery.map(|d| d.status))
}

fn ensure_valid(position: Coordinates) -> DeliveryResult<()> {
    if position.is_valid() {
        Ok(())
    } else {
        Err(DeliveryError::InvalidCoordinates {
            latitude: position.latitude,
            longitude: position.longitude,
        })
    }
}

fn ensure_participant(viewer: &CurrentUser, delivery: &Delivery) -> DeliveryResult<()> {
    let allowed = match viewer.role {
        Role::Staff => true,
        Role::Patient => delivery.patient_id == viewer.id,
        Role::Agent => delivery.agent_id == viewer.id,
    };
    if allowed {
        Ok(())
    } else {
        Err(DeliveryError::NotParticipant(delivery.id))
    }
}

fn build_detail(order: Order, delivery: Option<Delivery>) -> OrderDetail {
    let state = state_of(delivery.as_ref());
    let delivery = delivery.map(|d| DeliverySummary {
        id: d.id,
        agent_id: d.agent_id,
        status: d.status,
        instruction: d.instruction.clone(),
        position: d.position(),
        time_started: d.time_started,
    });
    OrderDetail {
        order,
        state,
        delivery,
    }
}

async fn load(conn: &mut SqliteConnection, delivery_id: i64) -> DeliveryResult<Delivery> {
    delivery_repo::find_by_id(&mut *conn, delivery_id)
        .await?
        .ok_or(DeliveryError::DeliveryNotFound(delivery_id))
}

async fn load_assigned(
    conn: &mut SqliteConnection,
    delivery_id: i64,
    agent_id: i64,
) -> DeliveryResult<Delivery> {
    let delivery = load(conn, delivery_id).await?;
    if delivery.agent_id != agent_id {
        return Err(DeliveryError::NotAssignedAgent(delivery_id));
    }
    Ok(delivery)
}

/// CAS 写入 0 行：重新读取并按最新状态判定
async fn reevaluate(
    conn: &mut SqliteConnection,
    delivery_id: i64,
    transition: Transition,
) -> DeliveryResult<Delivery> {
    let delivery = load(conn, delivery_id).await?;
    match lifecycle::apply(state_of(Some(&delivery)), transition)? {
        Step::Unchanged => Ok(delivery),
        Step::Advance(_) => {
            tracing::warn!(delivery_id, ?transition, "Status changed concurrently");
            Err(LifecycleError::NotInProgress.into())
        }
    }
}
