mod csv_store_tests;
