use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::constants::disk_geometry::SECTOR_SIZE;
use crate::constants::memory_layout::MEM_SIZE;
use crate::disk::SharedDisk;
use crate::log::Logger;
use crate::memory::SharedMemory;
use crate::word::Word;

/// SDMAIO direction values.
pub const DIRECTION_DISK_TO_MEMORY: u32 = 0;
pub const DIRECTION_MEMORY_TO_DISK: u32 = 1;

/// The DMA controller: five programmable registers, a busy flag, a status
/// flag, and the completion latch the CPU polls at each cycle boundary.
///
/// At most one transfer is in flight. The worker owns shared handles to
/// RAM and the disk for the duration of a transfer and is joined at
/// shutdown before the disk image is persisted.
pub struct DmaController {
    pub track: u32,
    pub cylinder: u32,
    pub sector: u32,
    pub direction: u32,
    pub memory_address: u32,
    /// Simulated seek/transfer latency the worker sleeps before touching
    /// the bus. Long enough to observe concurrency in single-step mode;
    /// tests shorten it.
    pub latency: Duration,
    busy: Arc<AtomicBool>,
    error: Arc<AtomicBool>,
    interrupt_latch: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    memory: SharedMemory,
    disk: SharedDisk,
    logger: Logger,
}

/// Register snapshot handed to the worker at start-of-transfer, so later
/// SDMAx writes cannot affect a transfer already in flight.
struct TransferRequest {
    cylinder: usize,
    track: usize,
    sector: usize,
    direction: u32,
    memory_address: usize,
}

impl DmaController {
    pub fn new(memory: SharedMemory, disk: SharedDisk, logger: Logger) -> DmaController {
        DmaController {
            track: 0,
            cylinder: 0,
            sector: 0,
            direction: DIRECTION_DISK_TO_MEMORY,
            memory_address: 0,
            latency: Duration::from_millis(150),
            busy: Arc::new(AtomicBool::new(false)),
            error: Arc::new(AtomicBool::new(false)),
            interrupt_latch: Arc::new(AtomicBool::new(false)),
            worker: None,
            memory,
            disk,
            logger,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn status_is_error(&self) -> bool {
        self.error.load(Ordering::SeqCst)
    }

    /// The completion line is edge-triggered: reading it clears it.
    pub fn take_interrupt(&self) -> bool {
        self.interrupt_latch.swap(false, Ordering::SeqCst)
    }

    /// Start a transfer with the registers as currently programmed. A busy
    /// controller rejects the request: the status goes to error and no
    /// interrupt is raised.
    pub fn start(&mut self) {
        if self.busy.load(Ordering::SeqCst) {
            self.logger.event("[dma] start requested while busy, rejected");
            self.error.store(true, Ordering::SeqCst);
            return;
        }
        // A finished worker leaves its handle behind; reap it before
        // spawning the next one.
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        // Busy is set here, not in the worker, so a second SDMAON arriving
        // before the thread is scheduled still sees the controller busy.
        self.busy.store(true, Ordering::SeqCst);
        self.error.store(false, Ordering::SeqCst);

        let request = TransferRequest {
            cylinder: self.cylinder as usize,
            track: self.track as usize,
            sector: self.sector as usize,
            direction: self.direction,
            memory_address: self.memory_address as usize,
        };
        let memory = Arc::clone(&self.memory);
        let disk = Arc::clone(&self.disk);
        let busy = Arc::clone(&self.busy);
        let error = Arc::clone(&self.error);
        let latch = Arc::clone(&self.interrupt_latch);
        let logger = self.logger.clone();
        let latency = self.latency;

        self.worker = Some(thread::spawn(move || {
            logger.event("[dma] transfer started");
            thread::sleep(latency);

            let failed = run_transfer(&request, &memory, &disk, &logger);

            busy.store(false, Ordering::SeqCst);
            error.store(failed, Ordering::SeqCst);
            latch.store(true, Ordering::SeqCst);
            logger.event("[dma] transfer finished, completion line raised");
        }));
    }

    /// Block until any in-flight transfer has completed. Called before the
    /// disk image is persisted.
    pub fn quiesce(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Returns true when the transfer failed. The bus is held for the entire
/// sector so the CPU observes either the pre-transfer or the post-transfer
/// image, never a partial one.
fn run_transfer(
    request: &TransferRequest,
    memory: &SharedMemory,
    disk: &SharedDisk,
    logger: &Logger,
) -> bool {
    let mut memory = memory.lock().unwrap();

    if request.memory_address + SECTOR_SIZE > MEM_SIZE {
        logger.event(&format!(
            "[dma] memory address {} out of bounds, transfer skipped",
            request.memory_address
        ));
        return true;
    }

    match request.direction {
        DIRECTION_DISK_TO_MEMORY => {
            let sector =
                disk.lock()
                    .unwrap()
                    .read_sector(request.cylinder, request.track, request.sector);
            match sector {
                Some(sector) => {
                    for (index, word) in sector.iter().enumerate() {
                        memory.write(request.memory_address + index, *word);
                    }
                    false
                }
                None => {
                    logger.event("[dma] sector address out of range, transfer skipped");
                    true
                }
            }
        }
        DIRECTION_MEMORY_TO_DISK => {
            let mut buffer = [Word::ZERO; SECTOR_SIZE];
            for (index, word) in buffer.iter_mut().enumerate() {
                *word = memory.read(request.memory_address + index);
            }
            let written = disk.lock().unwrap().write_sector(
                request.cylinder,
                request.track,
                request.sector,
                &buffer,
            );
            if !written {
                logger.event("[dma] sector address out of range, transfer skipped");
            }
            !written
        }
        _ => {
            logger.event(&format!(
                "[dma] direction {} is not valid, transfer skipped",
                request.direction
            ));
            true
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::disk::Disk;
    use crate::memory::Memory;
    use std::sync::Mutex;

    fn controller() -> DmaController {
        let memory = Memory::new_shared();
        let disk = Arc::new(Mutex::new(Disk::new()));
        let mut dma = DmaController::new(memory, disk, Logger::disabled());
        dma.latency = Duration::from_millis(1);
        dma
    }

    fn wait_for_completion(dma: &mut DmaController) {
        dma.quiesce();
    }

    #[test]
    fn disk_to_memory_copies_one_sector() {
        let mut dma = controller();
        {
            let mut disk = dma.disk.lock().unwrap();
            let mut payload = [Word::ZERO; SECTOR_SIZE];
            for (index, word) in payload.iter_mut().enumerate() {
                *word = Word::from_int((index as i64 + 1) * 7);
            }
            disk.write_sector(1, 2, 3, &payload);
        }
        dma.cylinder = 1;
        dma.track = 2;
        dma.sector = 3;
        dma.direction = DIRECTION_DISK_TO_MEMORY;
        dma.memory_address = 500;

        dma.start();
        wait_for_completion(&mut dma);

        assert!(!dma.is_busy());
        assert!(!dma.status_is_error());
        assert!(dma.take_interrupt());
        // Reading the latch cleared it.
        assert!(!dma.take_interrupt());

        let memory = dma.memory.lock().unwrap();
        for index in 0..SECTOR_SIZE {
            assert_eq!(memory.read(500 + index).to_int(), (index as i64 + 1) * 7);
        }
    }

    #[test]
    fn memory_to_disk_copies_one_sector() {
        let mut dma = controller();
        {
            let mut memory = dma.memory.lock().unwrap();
            for index in 0..SECTOR_SIZE {
                memory.write(700 + index, Word::from_int(index as i64 + 100));
            }
        }
        dma.cylinder = 4;
        dma.track = 5;
        dma.sector = 6;
        dma.direction = DIRECTION_MEMORY_TO_DISK;
        dma.memory_address = 700;

        dma.start();
        wait_for_completion(&mut dma);

        assert!(!dma.status_is_error());
        let sector = dma
            .disk
            .lock()
            .unwrap()
            .read_sector(4, 5, 6)
            .expect("valid geometry");
        assert_eq!(sector[0].to_int(), 100);
        assert_eq!(sector[SECTOR_SIZE - 1].to_int(), 100 + SECTOR_SIZE as i64 - 1);
    }

    #[test]
    fn out_of_bounds_memory_address_sets_error_status() {
        let mut dma = controller();
        dma.direction = DIRECTION_DISK_TO_MEMORY;
        dma.memory_address = (MEM_SIZE - 1) as u32;

        dma.start();
        wait_for_completion(&mut dma);

        assert!(dma.status_is_error());
        // Completion is still signalled so software can see the status.
        assert!(dma.take_interrupt());
    }

    #[test]
    fn out_of_range_geometry_sets_error_status() {
        let mut dma = controller();
        dma.direction = DIRECTION_DISK_TO_MEMORY;
        dma.sector = 100;
        dma.memory_address = 400;

        dma.start();
        wait_for_completion(&mut dma);

        assert!(dma.status_is_error());
    }

    #[test]
    fn busy_controller_rejects_a_second_start() {
        let mut dma = controller();
        dma.latency = Duration::from_millis(100);
        dma.direction = DIRECTION_DISK_TO_MEMORY;
        dma.memory_address = 400;

        dma.start();
        assert!(dma.is_busy());
        dma.start();
        // The rejection is visible in the status register.
        assert!(dma.status_is_error());

        wait_for_completion(&mut dma);
        // The first transfer still completes and overwrites the status.
        assert!(!dma.status_is_error());
        assert!(dma.take_interrupt());
    }
}
