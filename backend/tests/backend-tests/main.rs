mod batch_notifier;
